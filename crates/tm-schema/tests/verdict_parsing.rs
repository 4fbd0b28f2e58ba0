//! Reviewer responses of varying quality parsed end to end.

use pretty_assertions::assert_eq;
use tm_core::documents::{ReviewOutcome, TitleLabel, TitleScreeningEntry};
use tm_core::{ToolType, Verdict};
use tm_schema::registry::TITLE_SCREENING_RESPONSE;
use tm_schema::{SchemaRegistry, parse_list_response, parse_verdict_response};

#[test]
fn well_formed_response_is_reviewed() {
    let text = r#"```json
{
  "publication_type": "research article",
  "verdicts": [
    {"tool_name": "ImageJ", "tool_type": "computational_tool", "verdict": "accept",
     "confidence": 0.92, "reasoning": "Used for image quantification.",
     "recommended_action": "keep", "metadata": {"softwareVersion": "1.53k"}}
  ],
  "missed_tools": [],
  "suggested_patterns": [
    {"tool_type": "computational_tool", "pattern": "Fiji", "kind": "literal",
     "confidence": 0.95, "rationale": "ImageJ distribution"}
  ]
}
```"#;
    let parsed = parse_verdict_response(&SchemaRegistry::new(), text);
    assert_eq!(parsed.outcome, ReviewOutcome::Reviewed);
    assert_eq!(parsed.response.verdicts.len(), 1);
    assert_eq!(parsed.response.verdicts[0].verdict, Verdict::Accept);
    assert_eq!(
        parsed.response.verdicts[0].metadata.get("softwareVersion").map(String::as_str),
        Some("1.53k")
    );
    assert_eq!(parsed.response.suggested_patterns[0].pattern, "Fiji");
    assert_eq!(parsed.response.publication_type.as_deref(), Some("research article"));
}

#[test]
fn numeric_metadata_still_counts_as_reviewed() {
    let text = r#"{"verdicts": [
        {"tool_name": "PedsQL", "tool_type": "clinical_assessment_tool", "verdict": "accept",
         "confidence": 0.9, "reasoning": "Administered.", "metadata": {"numberOfItems": 23}}
    ]}"#;
    let parsed = parse_verdict_response(&SchemaRegistry::new(), text);
    assert_eq!(parsed.outcome, ReviewOutcome::Reviewed);
    assert_eq!(
        parsed.response.verdicts[0].metadata.get("numberOfItems").map(String::as_str),
        Some("23")
    );
}

#[test]
fn bad_entry_yields_partial_outcome() {
    let text = r#"{"verdicts": [
        {"tool_name": "ImageJ", "tool_type": "computational_tool", "verdict": "accept",
         "confidence": 0.9, "reasoning": "ok"},
        {"tool_name": "NF1", "tool_type": "gene", "verdict": "reject",
         "confidence": 0.9, "reasoning": "gene name"}
    ]}"#;
    let parsed = parse_verdict_response(&SchemaRegistry::new(), text);
    assert_eq!(parsed.response.verdicts.len(), 1);
    assert_eq!(parsed.response.verdicts[0].tool_type, ToolType::ComputationalTool);
    match parsed.outcome {
        ReviewOutcome::Partial { issues } => {
            assert_eq!(issues.len(), 1);
            assert!(issues[0].starts_with("verdicts[1]"));
        }
        other => panic!("expected partial, got {other:?}"),
    }
}

#[test]
fn prose_only_response_is_unparseable() {
    let parsed = parse_verdict_response(&SchemaRegistry::new(), "I could not find any tools.");
    assert!(parsed.outcome.is_unparseable());
    assert!(parsed.response.verdicts.is_empty());
}

#[test]
fn object_without_verdicts_is_unparseable() {
    let parsed = parse_verdict_response(&SchemaRegistry::new(), r#"{"tools": []}"#);
    match parsed.outcome {
        ReviewOutcome::Unparseable { reason } => assert!(reason.contains("verdicts")),
        other => panic!("expected unparseable, got {other:?}"),
    }
}

#[test]
fn screening_list_accepts_bare_array() {
    let text = r#"[{"pmid": "1", "verdict": "non_research", "confidence": 0.9, "reason": "review"}]"#;
    let parsed = parse_list_response::<TitleScreeningEntry>(
        &SchemaRegistry::new(),
        TITLE_SCREENING_RESPONSE,
        "results",
        text,
    );
    assert_eq!(parsed.outcome, ReviewOutcome::Reviewed);
    assert_eq!(parsed.items[0].verdict, TitleLabel::NonResearch);
}

#[test]
fn screening_entry_without_confidence_defaults_to_certain() {
    let text = r#"{"results": [{"pmid": "7", "verdict": "research"}]}"#;
    let parsed = parse_list_response::<TitleScreeningEntry>(
        &SchemaRegistry::new(),
        TITLE_SCREENING_RESPONSE,
        "results",
        text,
    );
    assert!((parsed.items[0].confidence - 1.0).abs() < f64::EPSILON);
}
