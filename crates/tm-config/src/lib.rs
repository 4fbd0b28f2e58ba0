//! # tm-config
//!
//! Layered configuration loading for toolmine using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`TOOLMINE_*` prefix, `__` as separator)
//! 2. An explicit file passed with `--config`
//! 3. Project-level `.toolmine/config.toml`
//! 4. User-level `~/.config/toolmine/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `TOOLMINE_REVIEW__API_KEY` -> `review.api_key`,
//! `TOOLMINE_BUDGET__CEILING_MINUTES` -> `budget.ceiling_minutes`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use tm_config::ToolmineConfig;
//!
//! let config = ToolmineConfig::load_with_dotenv().expect("config");
//! config.validate().expect("valid config");
//!
//! if config.review.is_configured() {
//!     println!("reviewer model: {}", config.review.model);
//! }
//! ```

mod budget;
mod error;
mod fulltext;
mod paths;
mod review;
mod run;
mod thresholds;

pub use budget::BudgetConfig;
pub use error::ConfigError;
pub use fulltext::FullTextConfig;
pub use paths::PathsConfig;
pub use review::ReviewConfig;
pub use run::RunConfig;
pub use thresholds::ThresholdsConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolmineConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub review: ReviewConfig,
    #[serde(default)]
    pub fulltext: FullTextConfig,
}

impl ToolmineConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] when a source fails to parse or a
    /// value has the wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Load with an explicit config file layered above the project file
    /// and below the environment.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::base_figment()
            .merge(Toml::file(path))
            .merge(Self::env_provider())
            .extract()
            .map_err(ConfigError::from)
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment or add providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        Self::base_figment().merge(Self::env_provider())
    }

    /// Reject values that would make a run meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate()?;
        self.budget.validate()?;
        self.run.validate()?;
        self.review.validate()?;
        Ok(())
    }

    /// Fail early when the reviewer is required but has no credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotConfigured`] for the `review` section.
    pub fn require_review(&self) -> Result<&ReviewConfig, ConfigError> {
        if self.review.is_configured() {
            Ok(&self.review)
        } else {
            Err(ConfigError::NotConfigured {
                section: "review".to_string(),
            })
        }
    }

    fn base_figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(".toolmine/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment
    }

    fn env_provider() -> Env {
        Env::prefixed("TOOLMINE_").split("__")
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("toolmine").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ToolmineConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.review.is_configured());
        assert!(!config.fulltext.is_configured());
    }

    #[test]
    fn figment_builds_without_files() {
        let figment = ToolmineConfig::figment();
        let config: ToolmineConfig = figment.extract().expect("should extract defaults");
        assert_eq!(config.run.parallel_workers, 4);
        assert_eq!(config.run.screening_batch_size, 50);
    }

    #[test]
    fn missing_review_key_is_reported() {
        let config = ToolmineConfig::default();
        let err = config.require_review().unwrap_err();
        assert!(matches!(err, ConfigError::NotConfigured { ref section } if section == "review"));
    }
}
