//! Per-run behavior switches.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const fn default_parallel_workers() -> usize {
    4
}

const fn default_screening_batch_size() -> usize {
    50
}

const fn default_extract_observations() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Re-run validation and observation extraction even when a document
    /// already exists for a publication.
    #[serde(default)]
    pub force_rerun: bool,

    /// Upper bound on concurrent reviewer calls.
    #[serde(default = "default_parallel_workers")]
    pub parallel_workers: usize,

    /// Publications per screening call.
    #[serde(default = "default_screening_batch_size")]
    pub screening_batch_size: usize,

    /// Skip both screening stages (every publication passes).
    #[serde(default)]
    pub skip_screening: bool,

    /// Run the observation-extraction phase after validation.
    #[serde(default = "default_extract_observations")]
    pub extract_observations: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            force_rerun: false,
            parallel_workers: default_parallel_workers(),
            screening_batch_size: default_screening_batch_size(),
            skip_screening: false,
            extract_observations: default_extract_observations(),
        }
    }
}

impl RunConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a zero worker count or batch size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel_workers == 0 {
            return Err(ConfigError::invalid("run.parallel_workers", "must be at least 1"));
        }
        if self.screening_batch_size == 0 {
            return Err(ConfigError::invalid("run.screening_batch_size", "must be at least 1"));
        }
        Ok(())
    }
}
