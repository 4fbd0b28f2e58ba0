//! Pipeline error type.
//!
//! Only startup problems and artifact writes surface as errors. Failures of
//! a single publication (fetch, review call) are counted and logged, never
//! returned.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] tm_config::ConfigError),

    #[error(transparent)]
    Cache(#[from] tm_cache::CacheError),

    #[error(transparent)]
    Extract(#[from] tm_extract::ExtractError),

    #[error(transparent)]
    Client(#[from] tm_clients::ClientError),

    /// The wall-clock budget cannot be computed from the given inputs.
    #[error("invalid budget: {0}")]
    Budget(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tempfile::PersistError> for PipelineError {
    fn from(error: tempfile::PersistError) -> Self {
        Self::Io(error.error)
    }
}
