use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{MatchKind, Section, ToolType};

/// An unvalidated tool mention produced by the candidate extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ToolCandidate {
    /// Canonical (database-preferred) name.
    pub name: String,
    /// Text as it appeared in the publication.
    pub matched_text: String,
    pub tool_type: ToolType,
    pub section: Section,
    /// Whitespace-collapsed text surrounding the mention.
    pub context: String,
    /// Match confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    pub match_kind: MatchKind,
    /// Set by the context classifier.
    #[serde(default)]
    pub is_development: bool,
    /// Set by the context classifier.
    #[serde(default)]
    pub is_established: bool,
    /// Fields read from the mention context (`softwareVersion`, `vendor`, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ToolCandidate {
    /// Deduplication key: canonical name (case-folded) and type.
    #[must_use]
    pub fn dedup_key(&self) -> (String, ToolType) {
        (self.name.to_lowercase(), self.tool_type)
    }
}

/// Fraction of `tool_type`'s critical fields that carry a non-blank value.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn critical_field_fraction(tool_type: ToolType, fields: &BTreeMap<String, String>) -> f64 {
    let critical = tool_type.critical_fields();
    if critical.is_empty() {
        return 0.0;
    }
    let populated = critical
        .iter()
        .filter(|name| fields.get(**name).is_some_and(|v| !v.trim().is_empty()))
        .count();
    populated as f64 / critical.len() as f64
}
