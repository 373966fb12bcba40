//! Tile maps: domain model, deterministic generation, visibility queries and
//! the map service built on the document store.
//!
//! # Invariants
//! - Every tile of a stored map lies inside its `width × height` grid and no
//!   two tiles share coordinates.
//! - Tile updates never move a tile and always advance `updatedAt`.
//! - Missing maps and tiles are reported as `None` / `false`, never as errors.
//!   Coordinates outside the grid are a validation error.

mod error;
pub mod model;
mod service;
pub mod terrain;
pub mod visibility;

pub use error::MapError;
pub use model::{GameMap, MapTile, NewMap, Properties, TerrainType, TilePatch};
pub use service::{MAPS_COLLECTION, MapService};
pub use visibility::{GridPosition, ViewQuery};
