use stoon_common::{ObjectId, ObjectIdError};
use stoon_persist::StoreError;

/// Errors from map operations.
///
/// Absence is never an error: lookups return `Option` and tile updates
/// return `bool`.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("invalid map id: {0}")]
    InvalidId(#[from] ObjectIdError),
    #[error("invalid map data: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("stored map {id} does not decode: {source}")]
    Corrupt {
        id: ObjectId,
        #[source]
        source: serde_json::Error,
    },
}

impl MapError {
    /// Whether the caller supplied bad input, as opposed to a storage fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidId(_) | Self::Validation(_))
    }
}
