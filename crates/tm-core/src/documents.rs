//! Documents exchanged with the AI review service and their persisted forms.
//!
//! `*Response` types describe what the reviewer is asked to return (their
//! JSON Schemas are sent along with each request). `*Document` types are what
//! toolmine writes to disk after defensive parsing; they always exist for a
//! reviewed publication, even when the reviewer's answer was unusable.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::enums::{ToolType, Verdict};
use crate::observation::Observation;

/// Clamp a reviewer-reported confidence into `[0.0, 1.0]`; NaN becomes 0.
#[must_use]
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

const fn default_confidence() -> f64 {
    1.0
}

/// Accept a JSON object of scalars and coerce every value to a string.
///
/// Reviewers routinely answer `"numberOfItems": 12` or `"diseaseSpecific": true`;
/// nulls are dropped, arrays are joined with `", "`.
fn lenient_string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| value_to_string(&value).map(|v| (key, v)))
        .collect())
}

fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_to_string).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        serde_json::Value::Object(_) => Some(value.to_string()),
    }
}

// ── Validation ─────────────────────────────────────────────────────

/// The reviewer's decision about one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationVerdict {
    pub tool_name: String,
    pub tool_type: ToolType,
    pub verdict: Verdict,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub recommended_action: String,
    /// Critical-field values the reviewer could read from the text.
    #[serde(default, deserialize_with = "lenient_string_map")]
    #[schemars(with = "BTreeMap<String, String>")]
    pub metadata: BTreeMap<String, String>,
}

impl ValidationVerdict {
    /// Verdict used when the reviewer gave no usable answer for a candidate.
    #[must_use]
    pub fn uncertain(tool_name: &str, tool_type: ToolType, reasoning: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            tool_type,
            verdict: Verdict::Uncertain,
            confidence: 0.0,
            reasoning: reasoning.into(),
            recommended_action: "manual review".to_string(),
            metadata: BTreeMap::new(),
        }
    }
}

/// A tool the reviewer found that the extractor missed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MissedToolCandidate {
    pub tool_name: String,
    pub tool_type: ToolType,
    /// Section or sentence where the tool appears.
    #[serde(default)]
    pub location: String,
    pub confidence: f64,
    #[serde(default)]
    pub should_be_added: bool,
}

/// Whether a suggested pattern is a plain name or a regular expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Literal,
    Regex,
}

const fn default_pattern_kind() -> PatternKind {
    PatternKind::Literal
}

/// A pattern the reviewer proposes adding to the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PatternSuggestion {
    pub tool_type: ToolType,
    pub pattern: String,
    #[serde(default = "default_pattern_kind")]
    pub kind: PatternKind,
    pub confidence: f64,
    #[serde(default)]
    pub rationale: String,
    /// Preferred name that matches of a regex pattern should map to.
    #[serde(default)]
    pub canonical_name: Option<String>,
}

/// What the reviewer is asked to return for a validation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VerdictResponse {
    /// Label such as "research article" or "questionnaire development".
    #[serde(default)]
    pub publication_type: Option<String>,
    pub verdicts: Vec<ValidationVerdict>,
    #[serde(default)]
    pub missed_tools: Vec<MissedToolCandidate>,
    #[serde(default)]
    pub suggested_patterns: Vec<PatternSuggestion>,
}

/// How a review ended.
///
/// ```text
/// reviewed     every entry parsed
/// partial      some entries unusable, those candidates became uncertain
/// unparseable  nothing usable, every candidate became uncertain
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReviewOutcome {
    Reviewed,
    Partial { issues: Vec<String> },
    Unparseable { reason: String },
}

impl ReviewOutcome {
    #[must_use]
    pub const fn is_unparseable(&self) -> bool {
        matches!(self, Self::Unparseable { .. })
    }
}

/// Persisted result of validating one publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VerdictDocument {
    pub pmid: String,
    pub outcome: ReviewOutcome,
    #[serde(default)]
    pub publication_type: Option<String>,
    pub verdicts: Vec<ValidationVerdict>,
    #[serde(default)]
    pub missed_tools: Vec<MissedToolCandidate>,
    #[serde(default)]
    pub pattern_suggestions: Vec<PatternSuggestion>,
    pub reviewed_at: DateTime<Utc>,
}

impl VerdictDocument {
    /// Verdict for a candidate, matched on case-folded name and type.
    #[must_use]
    pub fn verdict_for(&self, tool_name: &str, tool_type: ToolType) -> Option<&ValidationVerdict> {
        self.verdicts
            .iter()
            .find(|v| v.tool_type == tool_type && v.tool_name.eq_ignore_ascii_case(tool_name))
    }

    /// Number of verdicts with the given outcome.
    #[must_use]
    pub fn count(&self, verdict: Verdict) -> usize {
        self.verdicts.iter().filter(|v| v.verdict == verdict).count()
    }
}

// ── Screening ──────────────────────────────────────────────────────

/// Title-stage label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TitleLabel {
    Research,
    NonResearch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TitleScreeningEntry {
    pub pmid: String,
    pub verdict: TitleLabel,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TitleScreeningResponse {
    pub results: Vec<TitleScreeningEntry>,
}

/// Abstract-stage label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AbstractLabel {
    LikelyTools,
    Unlikely,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AbstractScreeningEntry {
    pub pmid: String,
    pub verdict: AbstractLabel,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Tool types the reviewer expects the full text to mention.
    #[serde(default)]
    pub tool_types: Vec<ToolType>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AbstractScreeningResponse {
    pub results: Vec<AbstractScreeningEntry>,
}

// ── Observations ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObservationEntry {
    pub resource_name: String,
    pub resource_type: ToolType,
    /// One of the observation category labels; unknown labels become "Other".
    pub category: String,
    pub details: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObservationResponse {
    pub observations: Vec<ObservationEntry>,
}

/// Persisted result of observation extraction for one publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObservationDocument {
    pub pmid: String,
    pub outcome: ReviewOutcome,
    pub observations: Vec<Observation>,
    pub extracted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn verdict_metadata_coerces_scalars() {
        let json = r#"{
            "tool_name": "PedsQL",
            "tool_type": "clinical_assessment_tool",
            "verdict": "accept",
            "confidence": 0.9,
            "reasoning": "Administered to participants.",
            "metadata": {"numberOfItems": 23, "diseaseSpecific": false, "targetPopulation": null,
                         "assessmentType": ["questionnaire", "self-report"]}
        }"#;
        let verdict: ValidationVerdict = serde_json::from_str(json).unwrap();
        assert_eq!(verdict.metadata.get("numberOfItems").unwrap(), "23");
        assert_eq!(verdict.metadata.get("diseaseSpecific").unwrap(), "false");
        assert!(!verdict.metadata.contains_key("targetPopulation"));
        assert_eq!(
            verdict.metadata.get("assessmentType").unwrap(),
            "questionnaire, self-report"
        );
        assert!(verdict.recommended_action.is_empty());
    }

    #[test]
    fn outcome_is_tagged_by_status() {
        let json = serde_json::to_value(ReviewOutcome::Unparseable {
            reason: "no JSON object".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "unparseable");
        assert_eq!(json["reason"], "no JSON object");
    }

    #[test]
    fn verdict_lookup_ignores_case() {
        let document = VerdictDocument {
            pmid: "1".into(),
            outcome: ReviewOutcome::Reviewed,
            publication_type: None,
            verdicts: vec![ValidationVerdict::uncertain(
                "ImageJ",
                ToolType::ComputationalTool,
                "no verdict returned",
            )],
            missed_tools: Vec::new(),
            pattern_suggestions: Vec::new(),
            reviewed_at: Utc::now(),
        };
        assert!(document.verdict_for("imagej", ToolType::ComputationalTool).is_some());
        assert!(document.verdict_for("imagej", ToolType::Antibody).is_none());
        assert_eq!(document.count(Verdict::Uncertain), 1);
    }

    #[test]
    fn screening_entry_defaults_confidence() {
        let entry: TitleScreeningEntry =
            serde_json::from_str(r#"{"pmid": "9", "verdict": "non_research"}"#).unwrap();
        assert_eq!(entry.verdict, TitleLabel::NonResearch);
        assert!((entry.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn clamp_handles_out_of_range_and_nan() {
        assert!((clamp_confidence(1.7) - 1.0).abs() < f64::EPSILON);
        assert!(clamp_confidence(-0.2).abs() < f64::EPSILON);
        assert!(clamp_confidence(f64::NAN).abs() < f64::EPSILON);
    }
}
