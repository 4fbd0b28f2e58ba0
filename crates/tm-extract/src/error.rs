//! Extraction error types.

/// Errors from loading pattern sets or compiling them into matchers.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// A pattern did not compile.
    #[error("Invalid pattern for {tool_type}: {pattern:?}: {source}")]
    InvalidPattern {
        tool_type: tm_core::ToolType,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Every tool type has an empty pattern set; nothing could ever match.
    #[error("Pattern set is empty for every tool type")]
    EmptyPatternSet,

    /// Pattern artifact could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Pattern artifact is not valid JSON for a pattern set.
    #[error("Pattern set JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tempfile::PersistError> for ExtractError {
    fn from(error: tempfile::PersistError) -> Self {
        Self::Io(error.error)
    }
}
