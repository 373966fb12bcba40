//! A single named collection mirrored to one JSON snapshot file.
//!
//! Snapshot layout: a JSON array of documents, each an object whose `_id` is
//! the 24-character hex form of its [`ObjectId`].

use crate::config::StoreConfig;
use crate::document::{Document, Filter, Rehydrated, json_kind, to_fields};
use crate::error::StoreError;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use serde_json::Value;
use std::collections::HashSet;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use stoon_common::ObjectId;

/// In-memory mirror of one collection snapshot.
///
/// Reads are served from memory. Every mutation rewrites the whole snapshot
/// through a temporary file and an atomic rename; if that write fails the
/// mutation is undone in memory and the error is returned.
#[derive(Debug)]
pub struct Collection {
    name: String,
    path: PathBuf,
    pretty: bool,
    docs: Vec<Document>,
    /// Non-object snapshot entries with their index in the snapshot array.
    /// Not queryable, but written back in place on every save.
    stray: Vec<(usize, Value)>,
}

impl Collection {
    /// Load a collection from its snapshot, creating an empty one if none
    /// exists.
    ///
    /// Entries with a missing, malformed or repeated `_id` get a fresh id and
    /// the snapshot is rewritten so those ids stay stable across restarts.
    /// Entries that are not objects are kept out of the collection but
    /// preserved on disk. A snapshot that does not parse as a JSON array is
    /// logged and left untouched, and the collection starts empty.
    pub fn load(name: &str, config: &StoreConfig) -> Result<Self, StoreError> {
        validate_name(name)?;
        let mut collection = Self {
            name: name.to_owned(),
            path: config.collection_path(name),
            pretty: config.pretty,
            docs: Vec::new(),
            stray: Vec::new(),
        };

        let bytes = match std::fs::read(&collection.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if let Some(dir) = collection.dir() {
                    std::fs::create_dir_all(dir)?;
                }
                collection.save()?;
                tracing::info!(
                    collection = name,
                    path = %collection.path.display(),
                    "created empty collection"
                );
                return Ok(collection);
            }
            Err(e) => return Err(e.into()),
        };

        let raw: Vec<Value> = match serde_json::from_slice(&bytes) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(
                    collection = name,
                    path = %collection.path.display(),
                    error = %e,
                    "snapshot unreadable, starting empty"
                );
                return Ok(collection);
            }
        };

        let mut taken = HashSet::with_capacity(raw.len());
        let mut repaired = 0usize;
        for (index, value) in raw.into_iter().enumerate() {
            let doc = match Document::rehydrate(value, &taken) {
                Rehydrated::Intact(doc) => doc,
                Rehydrated::Repaired(doc) => {
                    tracing::warn!(
                        collection = name,
                        index,
                        id = %doc.id(),
                        "assigned fresh document id"
                    );
                    repaired += 1;
                    doc
                }
                Rehydrated::Skipped(value) => {
                    tracing::warn!(
                        collection = name,
                        index,
                        kind = json_kind(&value),
                        "ignoring non-object snapshot entry"
                    );
                    collection.stray.push((index, value));
                    continue;
                }
            };
            taken.insert(doc.id());
            collection.docs.push(doc);
        }
        if repaired > 0 {
            collection.save()?;
        }

        tracing::debug!(
            collection = name,
            documents = collection.docs.len(),
            repaired,
            "loaded collection"
        );
        Ok(collection)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// All documents in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.docs.iter()
    }

    /// First document matching `filter`, in insertion order.
    pub fn find_one(&self, filter: &Filter) -> Option<&Document> {
        self.docs.iter().find(|doc| filter.matches(doc))
    }

    /// Every document matching `filter`, in insertion order.
    pub fn find<'a>(&'a self, filter: &'a Filter) -> impl Iterator<Item = &'a Document> + 'a {
        self.docs.iter().filter(move |doc| filter.matches(doc))
    }

    /// Insert a document and return its newly assigned id.
    ///
    /// `doc` must serialize to a JSON object. Any `_id` it carries is
    /// discarded: ids are only ever assigned here.
    pub fn insert_one<T: Serialize + ?Sized>(&mut self, doc: &T) -> Result<ObjectId, StoreError> {
        let fields = to_fields(doc)?;
        let mut id = ObjectId::new();
        while self.position(id).is_some() {
            id = ObjectId::new();
        }

        self.docs.push(Document::new(id, fields));
        if let Err(e) = self.save() {
            self.docs.pop();
            tracing::error!(collection = %self.name, error = %e, "insert not persisted, rolled back");
            return Err(e);
        }

        tracing::debug!(collection = %self.name, %id, "inserted document");
        Ok(id)
    }

    /// Replace every field of the document with `id`, keeping its identity
    /// and position. Returns `Ok(false)` when no such document exists.
    pub fn replace_one<T: Serialize + ?Sized>(
        &mut self,
        id: ObjectId,
        doc: &T,
    ) -> Result<bool, StoreError> {
        let fields = to_fields(doc)?;
        let Some(index) = self.position(id) else {
            return Ok(false);
        };

        let previous = self.docs[index].replace_fields(fields);
        if let Err(e) = self.save() {
            self.docs[index].replace_fields(previous);
            tracing::error!(collection = %self.name, %id, error = %e, "replace not persisted, rolled back");
            return Err(e);
        }

        tracing::debug!(collection = %self.name, %id, "replaced document");
        Ok(true)
    }

    fn position(&self, id: ObjectId) -> Option<usize> {
        self.docs.iter().position(|doc| doc.id() == id)
    }

    fn dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// Write the full document list to a temp file beside the snapshot, sync
    /// it, then rename it over the snapshot. An existing snapshot's
    /// permissions carry over to its replacement.
    fn save(&self) -> Result<(), StoreError> {
        let dir = self.dir().unwrap_or_else(|| Path::new("."));
        let mut builder = tempfile::Builder::new();
        builder.prefix(".stoon-").suffix(".tmp");
        match std::fs::metadata(&self.path) {
            Ok(meta) => {
                builder.permissions(meta.permissions());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let mut tmp = builder.tempfile_in(dir)?;
        {
            let snapshot = Snapshot {
                docs: &self.docs,
                stray: &self.stray,
            };
            let mut writer = BufWriter::new(tmp.as_file_mut());
            if self.pretty {
                serde_json::to_writer_pretty(&mut writer, &snapshot)?;
            } else {
                serde_json::to_writer(&mut writer, &snapshot)?;
            }
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        // The rename is done; a failed directory sync only weakens durability.
        if let Err(e) = sync_dir(dir) {
            tracing::warn!(collection = %self.name, error = %e, "snapshot directory not synced");
        }
        Ok(())
    }
}

/// Snapshot array: documents in order, with stray entries back at their
/// original indices.
struct Snapshot<'a> {
    docs: &'a [Document],
    stray: &'a [(usize, Value)],
}

impl Serialize for Snapshot<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.docs.len() + self.stray.len()))?;
        let mut docs = self.docs.iter();
        let mut stray = self.stray.iter().peekable();
        let mut slot = 0usize;
        loop {
            if let Some((_, value)) = stray.next_if(|(at, _)| *at <= slot) {
                seq.serialize_element(value)?;
            } else if let Some(doc) = docs.next() {
                seq.serialize_element(doc)?;
            } else if let Some((_, value)) = stray.next() {
                seq.serialize_element(value)?;
            } else {
                break;
            }
            slot += 1;
        }
        seq.end()
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollectionName(name.to_owned()))
    }
}
