//! Wall-clock budget configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const fn default_ceiling_minutes() -> f64 {
    360.0
}

const fn default_safety_margin_minutes() -> f64 {
    30.0
}

const fn default_setup_overhead_minutes() -> f64 {
    10.0
}

const fn default_minutes_per_publication() -> f64 {
    2.0
}

const fn default_use_measured_rate() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BudgetConfig {
    /// Hard wall-clock ceiling for one run (the CI job limit).
    #[serde(default = "default_ceiling_minutes")]
    pub ceiling_minutes: f64,

    /// Headroom kept free for writing artifacts after the last publication.
    #[serde(default = "default_safety_margin_minutes")]
    pub safety_margin_minutes: f64,

    /// Fixed setup cost (checkout, dependency install, index download).
    #[serde(default = "default_setup_overhead_minutes")]
    pub setup_overhead_minutes: f64,

    /// Estimated processing time per publication.
    #[serde(default = "default_minutes_per_publication")]
    pub minutes_per_publication: f64,

    /// Prefer the rate measured by the previous run over the estimate above.
    #[serde(default = "default_use_measured_rate")]
    pub use_measured_rate: bool,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            ceiling_minutes: default_ceiling_minutes(),
            safety_margin_minutes: default_safety_margin_minutes(),
            setup_overhead_minutes: default_setup_overhead_minutes(),
            minutes_per_publication: default_minutes_per_publication(),
            use_measured_rate: default_use_measured_rate(),
        }
    }
}

impl BudgetConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a non-positive ceiling or
    /// time per publication, or negative margins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.minutes_per_publication > 0.0) {
            return Err(ConfigError::invalid(
                "budget.minutes_per_publication",
                "must be greater than zero",
            ));
        }
        if !(self.ceiling_minutes > 0.0) {
            return Err(ConfigError::invalid("budget.ceiling_minutes", "must be greater than zero"));
        }
        if self.safety_margin_minutes < 0.0 || self.setup_overhead_minutes < 0.0 {
            return Err(ConfigError::invalid(
                "budget.safety_margin_minutes",
                "margins and overhead must not be negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_ci_job_limit() {
        let config = BudgetConfig::default();
        assert!((config.ceiling_minutes - 360.0).abs() < f64::EPSILON);
        assert!((config.safety_margin_minutes - 30.0).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_rate_is_rejected() {
        let config = BudgetConfig {
            minutes_per_publication: 0.0,
            ..BudgetConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
