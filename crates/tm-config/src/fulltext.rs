//! Full-text source configuration.

use serde::{Deserialize, Serialize};

const fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FullTextConfig {
    /// Directory of `<pmid>.json` section files. Takes precedence over `base_url`.
    #[serde(default)]
    pub directory: String,

    /// HTTP endpoint serving `GET {base_url}/{pmid}?tier=minimal|full`.
    #[serde(default)]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FullTextConfig {
    fn default() -> Self {
        Self {
            directory: String::new(),
            base_url: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FullTextConfig {
    /// Check if any full-text source is configured. Without one, mining
    /// falls back to titles and abstracts.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.directory.is_empty() || !self.base_url.is_empty()
    }
}
