//! Confidence thresholds.
//!
//! These values were tuned empirically; none of them is a correctness
//! guarantee, so every one is overridable (`TOOLMINE_THRESHOLDS__*`).

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const fn default_screening_min_confidence() -> f64 {
    0.6
}

const fn default_validation_accept() -> f64 {
    0.7
}

const fn default_critical_field_min() -> f64 {
    0.6
}

const fn default_fuzzy_match() -> f64 {
    0.83
}

const fn default_auto_pattern() -> f64 {
    0.9
}

const fn default_review_pattern() -> f64 {
    0.7
}

const fn default_observation_floor() -> f64 {
    0.8
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThresholdsConfig {
    /// A negative screening verdict excludes a publication only at or above
    /// this confidence.
    #[serde(default = "default_screening_min_confidence")]
    pub screening_min_confidence: f64,

    /// Minimum reviewer confidence for the `validated` tier.
    #[serde(default = "default_validation_accept")]
    pub validation_accept: f64,

    /// Minimum fraction of critical fields for the `filtered` tier.
    #[serde(default = "default_critical_field_min")]
    pub critical_field_min: f64,

    /// Minimum similarity for a fuzzy name match.
    #[serde(default = "default_fuzzy_match")]
    pub fuzzy_match: f64,

    /// Suggested patterns strictly above this are merged automatically.
    #[serde(default = "default_auto_pattern")]
    pub auto_pattern: f64,

    /// Suggested patterns at or above this (and not auto-merged) go to the
    /// human review report; below it they are discarded.
    #[serde(default = "default_review_pattern")]
    pub review_pattern: f64,

    /// Minimum accepted-tool confidence for observation extraction.
    #[serde(default = "default_observation_floor")]
    pub observation_floor: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            screening_min_confidence: default_screening_min_confidence(),
            validation_accept: default_validation_accept(),
            critical_field_min: default_critical_field_min(),
            fuzzy_match: default_fuzzy_match(),
            auto_pattern: default_auto_pattern(),
            review_pattern: default_review_pattern(),
            observation_floor: default_observation_floor(),
        }
    }
}

impl ThresholdsConfig {
    /// Every threshold must lie in `[0, 1]` and the review band must sit
    /// below the auto-merge cut.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("thresholds.screening_min_confidence", self.screening_min_confidence),
            ("thresholds.validation_accept", self.validation_accept),
            ("thresholds.critical_field_min", self.critical_field_min),
            ("thresholds.fuzzy_match", self.fuzzy_match),
            ("thresholds.auto_pattern", self.auto_pattern),
            ("thresholds.review_pattern", self.review_pattern),
            ("thresholds.observation_floor", self.observation_floor),
        ];
        for (field, value) in fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(field, format!("{value} is outside [0, 1]")));
            }
        }
        if self.review_pattern > self.auto_pattern {
            return Err(ConfigError::invalid(
                "thresholds.review_pattern",
                "must not exceed thresholds.auto_pattern",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ThresholdsConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.fuzzy_match - 0.83).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let config = ThresholdsConfig {
            validation_accept: 1.5,
            ..ThresholdsConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("validation_accept"));
    }

    #[test]
    fn inverted_pattern_band_is_rejected() {
        let config = ThresholdsConfig {
            review_pattern: 0.95,
            ..ThresholdsConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
