/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document must serialize to a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("invalid collection name {0:?}: use ASCII letters, digits, '_' or '-'")]
    InvalidCollectionName(String),
}
