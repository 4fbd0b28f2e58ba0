//! Cross-cutting error types for toolmine.
//!
//! Crate-specific errors (`CacheError`, `ClientError`, `PipelineError`, ...)
//! live in their own crates and wrap this one where needed.

use thiserror::Error;

/// Errors that can be raised by any toolmine crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A string did not name any variant of a fixed enumeration.
    #[error("unknown {kind}: '{value}'")]
    UnknownValue { kind: &'static str, value: String },

    /// Data failed validation (format, range, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
