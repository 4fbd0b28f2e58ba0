//! Client error types.

use thiserror::Error;

/// Errors from external collaborators: the AI review service, full-text
/// sources, and the publication index.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote API returned a non-success status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message or response body.
        message: String,
    },

    /// The remote API returned 429 Too Many Requests.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// A response or file could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// The collaborator has no configuration (missing API key or endpoint).
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Whether retrying the same call can succeed.
    ///
    /// Rate limits, 408, 5xx (including the 529 "overloaded" status), timeouts,
    /// and connection failures are transient. Everything else fails fast.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status == 408 || (500..600).contains(status),
            Self::Http(error) => error.is_timeout() || error.is_connect(),
            Self::Parse(_) | Self::NotConfigured(_) | Self::Io(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> ClientError {
        ClientError::Api {
            status,
            message: String::new(),
        }
    }

    #[test]
    fn server_errors_and_overload_are_transient() {
        assert!(api(500).is_transient());
        assert!(api(503).is_transient());
        assert!(api(529).is_transient());
        assert!(api(408).is_transient());
        assert!(ClientError::RateLimited { retry_after_secs: 5 }.is_transient());
    }

    #[test]
    fn client_errors_fail_fast() {
        assert!(!api(400).is_transient());
        assert!(!api(401).is_transient());
        assert!(!api(404).is_transient());
        assert!(!ClientError::Parse("bad".into()).is_transient());
        assert!(!ClientError::NotConfigured("review service").is_transient());
    }
}
