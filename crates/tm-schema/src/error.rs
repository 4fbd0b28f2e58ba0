//! Schema validation error types.

use thiserror::Error;

/// Errors from the schema registry and response parsing.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Requested schema name was not found in the registry.
    #[error("Schema not found: {0}")]
    NotFound(String),

    /// JSON value did not pass schema validation.
    #[error("Validation failed: {errors:?}")]
    ValidationFailed {
        /// Individual error messages from the validator.
        errors: Vec<String>,
    },

    /// Schema generation or compilation error.
    #[error("Schema generation error: {0}")]
    Generation(String),

    /// Response text contained no JSON document.
    #[error("No JSON document found in response")]
    NoJson,

    /// A JSON-looking span was found but did not parse.
    #[error("Malformed JSON: {0}")]
    Malformed(String),
}
