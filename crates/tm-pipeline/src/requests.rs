//! Reviewer request bodies.
//!
//! Every body is a JSON document so the reviewer (and test fakes) can read
//! the items back without scraping prose. The schema of the expected answer
//! is attached by [`ReviewRequest::with_schema`].

use serde::Serialize;
use serde_json::json;
use tm_clients::{ReviewRequest, ReviewTask};
use tm_core::ToolType;
use tm_core::publication::Publication;
use tm_core::tools::ToolCandidate;
use tm_schema::SchemaRegistry;
use tm_schema::registry::{
    ABSTRACT_SCREENING_RESPONSE, OBSERVATION_RESPONSE, TITLE_SCREENING_RESPONSE, VERDICT_RESPONSE,
};

const TITLE_INSTRUCTIONS: &str = "You screen biomedical publications by title. Label each publication \
research (primary research that may use laboratory or clinical tools) or non_research (case report, \
review, editorial, commentary, erratum). Give a confidence between 0 and 1 and a short reason.";

const ABSTRACT_INSTRUCTIONS: &str = "You screen biomedical abstracts for research-tool usage. Label each \
publication likely_tools when the full text probably names antibodies, cell lines, animal models, genetic \
reagents, biobanks, computational tools, advanced cellular models, patient-derived models, or clinical \
assessment tools; otherwise unlikely. List the tool types you expect.";

const VALIDATION_INSTRUCTIONS: &str = "You validate research-tool mentions mined from a publication. For \
every candidate decide accept (the publication uses or develops this research tool), reject (disease or \
gene name, generic term, or not a tool), or uncertain. Report critical fields you can read from the text, \
tools the miner missed, and name patterns that would have found them. Classify the publication type.";

const OBSERVATION_INSTRUCTIONS: &str = "You extract curated observations about validated research tools \
from a publication: phenotypes, growth, behavior, usage instructions, issues, and comments. Use the \
listed categories; use Other when none fits.";

/// Publication text sent to the reviewer is cut at this many bytes.
pub const MAX_EXCERPT_BYTES: usize = 60_000;

/// `text` cut to [`MAX_EXCERPT_BYTES`] on a char boundary.
#[must_use]
pub fn excerpt(text: &str) -> &str {
    if text.len() <= MAX_EXCERPT_BYTES {
        return text;
    }
    let mut end = MAX_EXCERPT_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[derive(Serialize)]
struct ScreeningItem<'a> {
    pmid: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none", rename = "abstract")]
    abstract_text: Option<&'a str>,
}

fn schema(registry: &SchemaRegistry, name: &str) -> serde_json::Value {
    registry.get(name).cloned().unwrap_or_else(|| {
        tracing::warn!(schema = name, "schema missing from registry; request sent without it");
        serde_json::Value::Null
    })
}

fn request(task: ReviewTask, instructions: &str, body: &serde_json::Value, schema: serde_json::Value) -> ReviewRequest {
    let body = serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
    let request = ReviewRequest::new(task, instructions, body);
    if schema.is_null() { request } else { request.with_schema(schema) }
}

#[must_use]
pub fn title_screening(registry: &SchemaRegistry, batch: &[&Publication]) -> ReviewRequest {
    let items: Vec<ScreeningItem<'_>> = batch
        .iter()
        .map(|p| ScreeningItem {
            pmid: &p.pmid,
            title: &p.title,
            abstract_text: None,
        })
        .collect();
    request(
        ReviewTask::TitleScreening,
        TITLE_INSTRUCTIONS,
        &json!({ "publications": items }),
        schema(registry, TITLE_SCREENING_RESPONSE),
    )
}

#[must_use]
pub fn abstract_screening(registry: &SchemaRegistry, batch: &[(&Publication, &str)]) -> ReviewRequest {
    let items: Vec<ScreeningItem<'_>> = batch
        .iter()
        .map(|(p, abstract_text)| ScreeningItem {
            pmid: &p.pmid,
            title: &p.title,
            abstract_text: Some(abstract_text),
        })
        .collect();
    let tool_types: Vec<&str> = ToolType::ALL.iter().map(|t| t.as_str()).collect();
    request(
        ReviewTask::AbstractScreening,
        ABSTRACT_INSTRUCTIONS,
        &json!({ "tool_types": tool_types, "publications": items }),
        schema(registry, ABSTRACT_SCREENING_RESPONSE),
    )
}

#[must_use]
pub fn validation(
    registry: &SchemaRegistry,
    publication: &Publication,
    candidates: &[ToolCandidate],
    expected_types: &[ToolType],
) -> ReviewRequest {
    let candidates: Vec<serde_json::Value> = candidates
        .iter()
        .map(|c| {
            json!({
                "tool_name": c.name,
                "tool_type": c.tool_type,
                "matched_text": c.matched_text,
                "section": c.section,
                "confidence": c.confidence,
                "match_kind": c.match_kind,
                "is_development": c.is_development,
                "is_established": c.is_established,
                "context": c.context,
                "metadata": c.metadata,
                "critical_fields": c.tool_type.critical_fields(),
            })
        })
        .collect();
    let body = json!({
        "pmid": publication.pmid,
        "title": publication.title,
        "journal": publication.journal,
        "year": publication.year,
        "expected_tool_types": expected_types,
        "candidates": candidates,
        "text": excerpt(&publication.full_text()),
    });
    request(
        ReviewTask::Validation,
        VALIDATION_INSTRUCTIONS,
        &body,
        schema(registry, VERDICT_RESPONSE),
    )
}

/// Tools whose observations are wanted: `(name, type)` pairs.
#[must_use]
pub fn observation_extraction(registry: &SchemaRegistry, publication: &Publication, tools: &[(String, ToolType)]) -> ReviewRequest {
    let tools: Vec<serde_json::Value> = tools
        .iter()
        .map(|(name, tool_type)| json!({ "resource_name": name, "resource_type": tool_type }))
        .collect();
    let categories: Vec<&str> = tm_core::ObservationCategory::ALL.iter().map(|c| c.as_str()).collect();
    let body = json!({
        "pmid": publication.pmid,
        "title": publication.title,
        "tools": tools,
        "categories": categories,
        "text": excerpt(&publication.full_text()),
    });
    request(
        ReviewTask::ObservationExtraction,
        OBSERVATION_INSTRUCTIONS,
        &body,
        schema(registry, OBSERVATION_RESPONSE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_cuts_on_char_boundary() {
        let text = "é".repeat(MAX_EXCERPT_BYTES);
        let cut = excerpt(&text);
        assert!(cut.len() <= MAX_EXCERPT_BYTES);
        assert!(cut.chars().all(|c| c == 'é'));
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn validation_body_lists_candidates_and_schema() {
        let registry = SchemaRegistry::new();
        let mut publication = Publication::new("9", "Imaging NF1 tumors");
        publication.abstract_text = Some("ImageJ was used.".into());
        let candidate = ToolCandidate {
            name: "ImageJ".into(),
            matched_text: "ImageJ".into(),
            tool_type: ToolType::ComputationalTool,
            section: tm_core::Section::Abstract,
            context: "ImageJ was used.".into(),
            confidence: 0.95,
            match_kind: tm_core::MatchKind::Literal,
            is_development: false,
            is_established: true,
            metadata: std::collections::BTreeMap::new(),
        };
        let request = validation(&registry, &publication, &[candidate], &[]);
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["pmid"], "9");
        assert_eq!(body["candidates"][0]["tool_type"], "computational_tool");
        assert!(request.schema.is_some());
    }
}
