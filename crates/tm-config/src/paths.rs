//! On-disk layout of a toolmine data directory.
//!
//! ```text
//! <data_dir>/
//!   cache/            one JSON file per publication (text cache)
//!   screening/        title.json, abstract.json
//!   verdicts/         one verdict document per publication
//!   observations/     one observation document per publication
//!   patterns.json     versioned pattern-set artifact
//!   output/           CSVs, summary, reports, deferred list
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_data_dir() -> String {
    ".toolmine".to_string()
}

fn default_publications() -> String {
    "publications.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Root of all persistent state.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// JSON Lines publication index (relative paths resolve against the
    /// working directory, not `data_dir`).
    #[serde(default = "default_publications")]
    pub publications: String,

    /// Pattern-set artifact; defaults to `<data_dir>/patterns.json`.
    #[serde(default)]
    pub patterns: String,

    /// Output directory; defaults to `<data_dir>/output`.
    #[serde(default)]
    pub output_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            publications: default_publications(),
            patterns: String::new(),
            output_dir: String::new(),
        }
    }
}

impl PathsConfig {
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    #[must_use]
    pub fn publications_path(&self) -> PathBuf {
        PathBuf::from(&self.publications)
    }

    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir().join("cache")
    }

    #[must_use]
    pub fn screening_dir(&self) -> PathBuf {
        self.data_dir().join("screening")
    }

    #[must_use]
    pub fn verdicts_dir(&self) -> PathBuf {
        self.data_dir().join("verdicts")
    }

    #[must_use]
    pub fn observations_dir(&self) -> PathBuf {
        self.data_dir().join("observations")
    }

    #[must_use]
    pub fn patterns_path(&self) -> PathBuf {
        if self.patterns.is_empty() {
            self.data_dir().join("patterns.json")
        } else {
            PathBuf::from(&self.patterns)
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        if self.output_dir.is_empty() {
            self.data_dir().join("output")
        } else {
            PathBuf::from(&self.output_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_live_under_data_dir() {
        let paths = PathsConfig {
            data_dir: "/tmp/tm".into(),
            ..PathsConfig::default()
        };
        assert_eq!(paths.cache_dir(), PathBuf::from("/tmp/tm/cache"));
        assert_eq!(paths.patterns_path(), PathBuf::from("/tmp/tm/patterns.json"));
        assert_eq!(paths.output_dir(), PathBuf::from("/tmp/tm/output"));
    }

    #[test]
    fn explicit_paths_override_defaults() {
        let paths = PathsConfig {
            patterns: "seed/patterns.json".into(),
            output_dir: "out".into(),
            ..PathsConfig::default()
        };
        assert_eq!(paths.patterns_path(), PathBuf::from("seed/patterns.json"));
        assert_eq!(paths.output_dir(), PathBuf::from("out"));
    }
}
