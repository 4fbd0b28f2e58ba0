//! Shared HTTP response helpers.
//!
//! Centralizes status-code checks (429 rate limiting with `Retry-After`
//! parsing, non-success → [`ClientError::Api`]) so the review client and the
//! full-text source stay focused on request construction and response mapping.

use std::time::Duration;

use crate::error::ClientError;

/// Build the shared `reqwest` client with a user agent and request timeout.
///
/// # Errors
///
/// Returns [`ClientError::Http`] if the TLS backend cannot be initialized.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client, ClientError> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("toolmine/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()?)
}

/// Check an HTTP response for common error conditions.
///
/// Returns the response unchanged on success. Handles:
/// - **429 Too Many Requests** → [`ClientError::RateLimited`] with
///   `Retry-After` header parsing (falls back to 60 s if absent or
///   unparseable).
/// - **Non-success status** → [`ClientError::Api`] with status code and
///   response body.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    if resp.status() == 429 {
        let retry_after = parse_retry_after(&resp);
        return Err(ClientError::RateLimited {
            retry_after_secs: retry_after,
        });
    }
    if !resp.status().is_success() {
        return Err(ClientError::Api {
            status: resp.status().as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

/// Parse the `Retry-After` header as seconds, falling back to 60 s.
fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_response(status: u16) -> reqwest::Response {
        reqwest::Response::from(::http::Response::builder().status(status).body("").unwrap())
    }

    fn mock_response_with_retry_after(status: u16, value: &str) -> reqwest::Response {
        reqwest::Response::from(
            ::http::Response::builder()
                .status(status)
                .header("Retry-After", value)
                .body("")
                .unwrap(),
        )
    }

    #[test]
    fn parse_retry_after_from_header() {
        let resp = mock_response_with_retry_after(429, "120");
        assert_eq!(parse_retry_after(&resp), 120);
    }

    #[test]
    fn parse_retry_after_missing_header() {
        let resp = mock_response(429);
        assert_eq!(parse_retry_after(&resp), 60);
    }

    #[test]
    fn parse_retry_after_http_date_falls_back() {
        let resp = mock_response_with_retry_after(429, "Wed, 21 Oct 2026 07:28:00 GMT");
        assert_eq!(parse_retry_after(&resp), 60);
    }

    #[tokio::test]
    async fn check_response_rate_limited_with_header() {
        let resp = mock_response_with_retry_after(429, "30");
        let err = check_response(resp).await.unwrap_err();
        assert!(matches!(err, ClientError::RateLimited { retry_after_secs: 30 }));
    }

    #[tokio::test]
    async fn check_response_overloaded_is_api_error() {
        let resp = mock_response(529);
        let err = check_response(resp).await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 529, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn check_response_success() {
        let resp = mock_response(200);
        assert!(check_response(resp).await.is_ok());
    }

    #[test]
    fn client_builds() {
        assert!(build_client(30).is_ok());
    }
}
