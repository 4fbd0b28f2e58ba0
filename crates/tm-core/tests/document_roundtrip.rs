//! Serde roundtrip and JsonSchema validation tests for persisted documents.

use std::collections::BTreeMap;

use chrono::Utc;
use schemars::schema_for;
use tm_core::documents::*;
use tm_core::observation::Observation;
use tm_core::publication::Publication;
use tm_core::tools::ToolCandidate;
use tm_core::*;

fn validate_against_schema(
    schema: &serde_json::Value,
    instance: &serde_json::Value,
) -> Vec<String> {
    let validator = jsonschema::validator_for(schema).expect("schema should be valid");
    validator
        .iter_errors(instance)
        .map(|e| format!("{e}"))
        .collect()
}

macro_rules! roundtrip_and_validate {
    ($name:ident, $ty:ty, $instance:expr) => {
        #[test]
        fn $name() {
            let val: $ty = $instance;

            let json_str = serde_json::to_string_pretty(&val).unwrap();
            let recovered: $ty = serde_json::from_str(&json_str).unwrap();
            assert_eq!(recovered, val, "serde roundtrip failed for {}", stringify!($ty));

            let schema = serde_json::to_value(schema_for!($ty)).unwrap();
            let instance = serde_json::to_value(&val).unwrap();
            let errors = validate_against_schema(&schema, &instance);
            assert!(
                errors.is_empty(),
                "Schema validation failed for {}: {:?}",
                stringify!($ty),
                errors
            );
        }
    };
}

roundtrip_and_validate!(
    verdict_document_roundtrip,
    VerdictDocument,
    VerdictDocument {
        pmid: "34567890".into(),
        outcome: ReviewOutcome::Partial {
            issues: vec!["entry 2: missing field `verdict`".into()],
        },
        publication_type: Some("research article".into()),
        verdicts: vec![ValidationVerdict {
            tool_name: "anti-neurofibromin".into(),
            tool_type: ToolType::Antibody,
            verdict: Verdict::Accept,
            confidence: 0.92,
            reasoning: "Used for western blot in Methods.".into(),
            recommended_action: "add".into(),
            metadata: BTreeMap::from([("hostOrganism".to_string(), "rabbit".to_string())]),
        }],
        missed_tools: vec![MissedToolCandidate {
            tool_name: "ST88-14".into(),
            tool_type: ToolType::CellLine,
            location: "methods".into(),
            confidence: 0.8,
            should_be_added: true,
        }],
        pattern_suggestions: vec![PatternSuggestion {
            tool_type: ToolType::CellLine,
            pattern: "ST88-14".into(),
            kind: PatternKind::Literal,
            confidence: 0.95,
            rationale: "MPNST line missing from known names".into(),
            canonical_name: None,
        }],
        reviewed_at: Utc::now(),
    }
);

roundtrip_and_validate!(
    observation_document_roundtrip,
    ObservationDocument,
    ObservationDocument {
        pmid: "1".into(),
        outcome: ReviewOutcome::Reviewed,
        observations: vec![Observation {
            resource_name: "Nf1+/-".into(),
            resource_type: ToolType::AnimalModel,
            category: ObservationCategory::TumorGrowth,
            details: "Plexiform neurofibromas by 6 months.".into(),
            doi: Some("10.1000/xyz".into()),
            confidence: 0.85,
        }],
        extracted_at: Utc::now(),
    }
);

roundtrip_and_validate!(
    candidate_roundtrip,
    ToolCandidate,
    ToolCandidate {
        name: "ImageJ".into(),
        matched_text: "ImageJ".into(),
        tool_type: ToolType::ComputationalTool,
        section: Section::Methods,
        context: "Data were analyzed using ImageJ (v1.53k).".into(),
        confidence: 0.95,
        match_kind: MatchKind::Literal,
        is_development: false,
        is_established: true,
        metadata: BTreeMap::from([("softwareVersion".to_string(), "1.53k".to_string())]),
    }
);

roundtrip_and_validate!(publication_roundtrip, Publication, {
    let mut publication = Publication::new("42", "Nf1 knockout mice develop tumors");
    publication.year = Some(2020);
    publication.query_origins.insert(QueryOrigin::BenchScience);
    publication
        .sections
        .insert(Section::Methods, "Mice were obtained from JAX.".into());
    publication
});

#[test]
fn verdict_response_schema_rejects_unknown_verdict() {
    let schema = serde_json::to_value(schema_for!(VerdictResponse)).unwrap();
    let instance = serde_json::json!({
        "verdicts": [{
            "tool_name": "X",
            "tool_type": "antibody",
            "verdict": "maybe",
            "confidence": 0.5,
            "reasoning": "?"
        }]
    });
    assert!(!validate_against_schema(&schema, &instance).is_empty());
}
