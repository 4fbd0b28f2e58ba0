//! Bounded exponential backoff for transient external failures.
//!
//! Every external call (review service, full-text fetch) goes through
//! [`with_retry`]. Only errors for which [`ClientError::is_transient`] holds
//! are retried; the last error is returned once attempts run out, never
//! swallowed.

use std::future::Future;
use std::time::Duration;

use tm_config::ReviewConfig;

use crate::error::ClientError;

/// Retry behavior for external calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial one).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Maximum delay between retries (backoff and `Retry-After` are capped here).
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &ReviewConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_secs(config.max_delay_secs),
        }
    }

    /// Policy that makes exactly one attempt.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Wait before the next attempt: the server's `Retry-After` when given,
    /// else the current backoff, both capped at `max_delay`.
    fn delay_for(&self, error: &ClientError, backoff: Duration) -> Duration {
        let wanted = match error {
            ClientError::RateLimited { retry_after_secs } => Duration::from_secs(*retry_after_secs),
            _ => backoff,
        };
        wanted.min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails permanently, or attempts run out.
///
/// `label` names the call in log events.
///
/// # Errors
///
/// Returns the first non-transient error, or the last transient error once
/// `policy.max_attempts` is reached.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff = policy.base_delay;
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_for(&error, backoff);
                tracing::warn!(
                    call = label,
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    %error,
                    "transient failure; retrying"
                );
                tokio::time::sleep(delay).await;
                backoff = std::cmp::min(backoff * 2, policy.max_delay);
                attempt += 1;
            }
            Err(error) => {
                if error.is_transient() {
                    tracing::error!(call = label, attempts = attempt, %error, "retries exhausted");
                }
                return Err(error);
            }
        }
    }
}
