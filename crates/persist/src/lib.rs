//! Persistence: a minimal embedded document store.
//!
//! Each named collection is an ordered list of JSON documents held in memory
//! and mirrored to a single snapshot file, `<data_dir>/<name>.json`.
//!
//! # Invariants
//! - Every document carries an [`ObjectId`] assigned by the store on insert.
//! - After a successful mutation the snapshot equals the in-memory list.
//! - After a failed mutation the in-memory list is rolled back.
//! - Snapshots are replaced by write-to-temp + atomic rename, never in place.
//! - At most one live [`Collection`] exists per name within a [`Database`].

mod collection;
mod config;
mod database;
mod document;
mod error;

pub use collection::Collection;
pub use config::StoreConfig;
pub use database::{CollectionHandle, Database};
pub use document::{Document, Fields, Filter, ID_FIELD};
pub use error::StoreError;
pub use stoon_common::ObjectId;
