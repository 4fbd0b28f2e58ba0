//! Cache error types.

/// Errors from the text cache store.
///
/// Reads never produce these: an unreadable entry is reported as absent.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Publication id is empty after trimming.
    #[error("Invalid cache key: {0:?}")]
    InvalidKey(String),
}

impl From<tempfile::PersistError> for CacheError {
    fn from(error: tempfile::PersistError) -> Self {
        Self::Io(error.error)
    }
}
