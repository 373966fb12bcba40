use crate::collection::Collection;
use crate::config::StoreConfig;
use crate::error::StoreError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared handle to a live collection. Lock it for the whole of any
/// read-modify-write sequence.
pub type CollectionHandle = Arc<Mutex<Collection>>;

/// Registry of open collections.
///
/// Constructed explicitly and passed to whoever needs it. Each collection is
/// loaded on first request and the same handle is returned afterwards, so at
/// most one engine per name is ever live.
#[derive(Debug)]
pub struct Database {
    config: StoreConfig,
    collections: Mutex<HashMap<String, CollectionHandle>>,
}

impl Database {
    /// Open the store rooted at `config.data_dir`, creating the directory if
    /// needed.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&config.data_dir)?;
        tracing::info!(data_dir = %config.data_dir.display(), "document store ready");
        Ok(Self {
            config,
            collections: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Handle to the named collection, loading it on first use.
    pub fn collection(&self, name: &str) -> Result<CollectionHandle, StoreError> {
        let mut open = self.collections.lock();
        if let Some(handle) = open.get(name) {
            return Ok(Arc::clone(handle));
        }
        let handle = Arc::new(Mutex::new(Collection::load(name, &self.config)?));
        open.insert(name.to_owned(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Names of the collections opened so far, sorted.
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Shut the store down. Every mutation is already on disk, so this only
    /// releases the registry's handles.
    pub fn close(self) {
        tracing::info!(collections = ?self.collection_names(), "document store closed");
    }
}
