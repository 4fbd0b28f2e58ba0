//! AI review service configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_timeout_secs() -> u64 {
    120
}

const fn default_max_attempts() -> u32 {
    4
}

const fn default_base_delay_ms() -> u64 {
    1_000
}

const fn default_max_delay_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReviewConfig {
    /// API key for the Messages endpoint.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Model used for the two screening stages; empty means `model`.
    #[serde(default)]
    pub screening_model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay; doubles per retry.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Backoff cap, also the cap on honored `Retry-After` values.
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            screening_model: String::new(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl ReviewConfig {
    /// Check if the reviewer can be called.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.base_url.is_empty() && !self.model.is_empty()
    }

    /// Model for screening calls.
    #[must_use]
    pub fn screening_model(&self) -> &str {
        if self.screening_model.is_empty() {
            &self.model
        } else {
            &self.screening_model
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when `max_attempts` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("review.max_attempts", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_without_key() {
        let config = ReviewConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.screening_model(), config.model);
    }

    #[test]
    fn screening_model_override() {
        let config = ReviewConfig {
            screening_model: "small".into(),
            ..ReviewConfig::default()
        };
        assert_eq!(config.screening_model(), "small");
    }
}
