//! Observation extraction for confidently accepted tools.
//!
//! Runs after validation with the same pool, skip, and force behavior. The
//! publication's cache entry is upgraded to `full` first so results and
//! discussion are available to the reviewer.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tm_clients::ReviewService;
use tm_core::documents::{ObservationDocument, ObservationEntry, VerdictDocument};
use tm_core::observation::Observation;
use tm_core::publication::Publication;
use tm_core::{CacheTier, ToolType, Verdict};
use tm_schema::registry::OBSERVATION_RESPONSE;
use tm_schema::{SchemaRegistry, parse_list_response};

use crate::fetch::TextFetcher;
use crate::persist::{read_json, write_json_atomic};
use crate::pool::run_bounded;
use crate::requests;
use crate::validation::ReviewStatus;

/// Accepted tools of `document` at or above `floor`, as `(name, type)`.
#[must_use]
pub fn eligible_tools(document: &VerdictDocument, floor: f64) -> Vec<(String, ToolType)> {
    document
        .verdicts
        .iter()
        .filter(|v| v.verdict == Verdict::Accept && v.confidence >= floor)
        .map(|v| (v.tool_name.clone(), v.tool_type))
        .collect()
}

#[derive(Debug)]
pub struct ObservationResult {
    pub pmid: String,
    pub status: ReviewStatus,
    pub document: Option<ObservationDocument>,
}

/// One unit of observation work.
#[derive(Debug, Clone)]
pub struct ObservationWork {
    pub publication: Publication,
    pub tools: Vec<(String, ToolType)>,
}

#[derive(Clone)]
pub struct ObservationPhase {
    service: Arc<dyn ReviewService>,
    registry: Arc<SchemaRegistry>,
    fetcher: TextFetcher,
    dir: PathBuf,
    force: bool,
    workers: usize,
}

impl ObservationPhase {
    #[must_use]
    pub fn new(
        service: Arc<dyn ReviewService>,
        registry: Arc<SchemaRegistry>,
        fetcher: TextFetcher,
        dir: PathBuf,
        force: bool,
        workers: usize,
    ) -> Self {
        Self {
            service,
            registry,
            fetcher,
            dir,
            force,
            workers,
        }
    }

    #[must_use]
    pub fn document_path(&self, pmid: &str) -> PathBuf {
        self.dir.join(format!("{}.json", tm_cache::sanitize_key(pmid)))
    }

    pub async fn extract_all(&self, works: Vec<ObservationWork>) -> Vec<ObservationResult> {
        let pmids: Vec<String> = works.iter().map(|w| w.publication.pmid.clone()).collect();
        let this = self.clone();
        let results = run_bounded(works, self.workers, move |work| {
            let this = this.clone();
            async move { this.extract_one(work).await }
        })
        .await;
        results
            .into_iter()
            .zip(pmids)
            .map(|(result, pmid)| {
                result.unwrap_or_else(|| ObservationResult {
                    pmid,
                    status: ReviewStatus::Failed("worker task lost".to_string()),
                    document: None,
                })
            })
            .collect()
    }

    async fn extract_one(&self, work: ObservationWork) -> ObservationResult {
        let ObservationWork { mut publication, tools } = work;
        let pmid = publication.pmid.clone();
        let path = self.document_path(&pmid);
        let failed = |reason: String| ObservationResult {
            pmid: pmid.clone(),
            status: ReviewStatus::Failed(reason),
            document: None,
        };

        if !self.force {
            if let Some(document) = read_json::<ObservationDocument>(&path) {
                return ObservationResult {
                    pmid: pmid.clone(),
                    status: ReviewStatus::Reused,
                    document: Some(document),
                };
            }
        }

        if let Err(error) = self.fetcher.ensure_tier(&mut publication, CacheTier::Full).await {
            tracing::error!(%pmid, %error, "full-text upgrade failed");
            return failed(error.to_string());
        }

        let request = requests::observation_extraction(&self.registry, &publication, &tools);
        let text = match self.service.complete(&request).await {
            Ok(text) => text,
            Err(error) => {
                tracing::error!(%pmid, %error, "observation call failed");
                return failed(error.to_string());
            }
        };

        let parsed = parse_list_response::<ObservationEntry>(&self.registry, OBSERVATION_RESPONSE, "observations", &text);
        let observations = parsed
            .items
            .into_iter()
            .filter_map(|entry| join_to_tool(entry, &tools))
            .map(|entry| Observation::from_entry(entry, publication.doi.clone()))
            .collect();
        let document = ObservationDocument {
            pmid: pmid.clone(),
            outcome: parsed.outcome,
            observations,
            extracted_at: Utc::now(),
        };
        if let Err(error) = write_json_atomic(&path, &document) {
            tracing::error!(%pmid, %error, "observation document write failed");
            return failed(error.to_string());
        }
        tracing::debug!(%pmid, observations = document.observations.len(), "observations extracted");
        ObservationResult {
            pmid: pmid.clone(),
            status: ReviewStatus::Reviewed,
            document: Some(document),
        }
    }
}

/// Keep only observations about a requested tool, renamed to its canonical name.
fn join_to_tool(mut entry: ObservationEntry, tools: &[(String, ToolType)]) -> Option<ObservationEntry> {
    let Some((name, tool_type)) = tools
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(entry.resource_name.trim()))
    else {
        tracing::debug!(resource = %entry.resource_name, "observation for an unrequested tool; dropped");
        return None;
    };
    entry.resource_name.clone_from(name);
    entry.resource_type = *tool_type;
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tm_core::documents::{ReviewOutcome, ValidationVerdict};

    fn verdict(name: &str, verdict: Verdict, confidence: f64) -> ValidationVerdict {
        ValidationVerdict {
            tool_name: name.into(),
            tool_type: ToolType::AnimalModel,
            verdict,
            confidence,
            reasoning: "r".into(),
            recommended_action: String::new(),
            metadata: std::collections::BTreeMap::new(),
        }
    }

    #[test]
    fn only_confident_accepts_are_eligible() {
        let document = VerdictDocument {
            pmid: "1".into(),
            outcome: ReviewOutcome::Reviewed,
            publication_type: None,
            verdicts: vec![
                verdict("Nf1+/-", Verdict::Accept, 0.85),
                verdict("Nf1 flox", Verdict::Accept, 0.75),
                verdict("Nf2", Verdict::Reject, 0.95),
            ],
            missed_tools: Vec::new(),
            pattern_suggestions: Vec::new(),
            reviewed_at: Utc::now(),
        };
        assert_eq!(eligible_tools(&document, 0.8), vec![("Nf1+/-".to_string(), ToolType::AnimalModel)]);
    }

    #[test]
    fn observations_join_on_folded_name() {
        let tools = vec![("Nf1+/-".to_string(), ToolType::AnimalModel)];
        let entry = ObservationEntry {
            resource_name: " NF1+/- ".into(),
            resource_type: ToolType::GeneticReagent,
            category: "Body Weight".into(),
            details: "Lighter at 8 weeks.".into(),
            confidence: 0.9,
        };
        let joined = join_to_tool(entry.clone(), &tools).unwrap();
        assert_eq!(joined.resource_name, "Nf1+/-");
        assert_eq!(joined.resource_type, ToolType::AnimalModel);

        let other = ObservationEntry {
            resource_name: "C57BL/6".into(),
            ..entry
        };
        assert!(join_to_tool(other, &tools).is_none());
    }
}
