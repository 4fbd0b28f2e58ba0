//! Validation orchestrator: one structured review per publication.
//!
//! Each publication with candidates gets a verdict document in
//! `verdicts/<pmid>.json`. An existing document is reused without a service
//! call unless force-rerun is set. Every candidate ends up with exactly one
//! verdict; candidates the reviewer skipped, and all candidates of an
//! unusable response, become uncertain.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tm_clients::ReviewService;
use tm_core::documents::{ReviewOutcome, ValidationVerdict, VerdictDocument, clamp_confidence};
use tm_core::tools::ToolCandidate;
use tm_schema::{ParsedVerdicts, SchemaRegistry, parse_verdict_response};

use crate::mining::PublicationWork;
use crate::persist::{read_json, write_json_atomic};
use crate::pool::run_bounded;
use crate::requests;

pub const NO_VERDICT_REASON: &str = "no verdict returned";

/// How a publication's review was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewStatus {
    /// A service call was made and its document written.
    Reviewed,
    /// An existing document was reused.
    Reused,
    /// The call (or fetch) failed after retries; nothing was written.
    Failed(String),
}

#[derive(Debug)]
pub struct ValidationResult {
    pub pmid: String,
    pub status: ReviewStatus,
    /// `None` only when the worker task itself was lost.
    pub work: Option<PublicationWork>,
    pub document: Option<VerdictDocument>,
}

#[derive(Clone)]
pub struct ValidationOrchestrator {
    service: Arc<dyn ReviewService>,
    registry: Arc<SchemaRegistry>,
    dir: PathBuf,
    force: bool,
    workers: usize,
}

impl ValidationOrchestrator {
    #[must_use]
    pub fn new(
        service: Arc<dyn ReviewService>,
        registry: Arc<SchemaRegistry>,
        dir: PathBuf,
        force: bool,
        workers: usize,
    ) -> Self {
        Self {
            service,
            registry,
            dir,
            force,
            workers,
        }
    }

    #[must_use]
    pub fn document_path(&self, pmid: &str) -> PathBuf {
        self.dir.join(format!("{}.json", tm_cache::sanitize_key(pmid)))
    }

    /// Validate every publication on the bounded worker pool.
    pub async fn validate_all(&self, works: Vec<PublicationWork>) -> Vec<ValidationResult> {
        let pmids: Vec<String> = works.iter().map(|w| w.publication.pmid.clone()).collect();
        let this = self.clone();
        let results = run_bounded(works, self.workers, move |work| {
            let this = this.clone();
            async move { this.validate_one(work).await }
        })
        .await;

        results
            .into_iter()
            .zip(pmids)
            .map(|(result, pmid)| {
                result.unwrap_or_else(|| ValidationResult {
                    pmid,
                    status: ReviewStatus::Failed("worker task lost".to_string()),
                    work: None,
                    document: None,
                })
            })
            .collect()
    }

    async fn validate_one(&self, work: PublicationWork) -> ValidationResult {
        let pmid = work.publication.pmid.clone();
        let path = self.document_path(&pmid);

        if !self.force {
            if let Some(document) = read_json::<VerdictDocument>(&path) {
                tracing::debug!(%pmid, "verdict document exists; reusing");
                return ValidationResult {
                    pmid,
                    status: ReviewStatus::Reused,
                    work: Some(work),
                    document: Some(document),
                };
            }
        }

        let request = requests::validation(&self.registry, &work.publication, &work.candidates, &work.expected_types);
        let text = match self.service.complete(&request).await {
            Ok(text) => text,
            Err(error) => {
                tracing::error!(%pmid, %error, "validation call failed");
                return ValidationResult {
                    pmid,
                    status: ReviewStatus::Failed(error.to_string()),
                    work: Some(work),
                    document: None,
                };
            }
        };

        let parsed = parse_verdict_response(&self.registry, &text);
        let document = reconcile(&pmid, &work.candidates, parsed, Utc::now());
        if let ReviewOutcome::Unparseable { reason } = &document.outcome {
            tracing::warn!(%pmid, %reason, "reviewer response unparseable; all candidates uncertain");
        }
        if let Err(error) = write_json_atomic(&path, &document) {
            tracing::error!(%pmid, %error, "verdict document write failed");
            return ValidationResult {
                pmid,
                status: ReviewStatus::Failed(error.to_string()),
                work: Some(work),
                document: None,
            };
        }
        tracing::debug!(
            %pmid,
            verdicts = document.verdicts.len(),
            missed = document.missed_tools.len(),
            suggestions = document.pattern_suggestions.len(),
            "publication validated"
        );
        ValidationResult {
            pmid,
            status: ReviewStatus::Reviewed,
            work: Some(work),
            document: Some(document),
        }
    }
}

/// Build the verdict document: exactly one verdict per candidate, in
/// candidate order.
///
/// A reviewer verdict matches a candidate on case-folded name (canonical or
/// as matched) and type; failing that, on name alone, keeping the
/// candidate's type.
#[must_use]
pub fn reconcile(
    pmid: &str,
    candidates: &[ToolCandidate],
    parsed: ParsedVerdicts,
    reviewed_at: DateTime<Utc>,
) -> VerdictDocument {
    let ParsedVerdicts { response, outcome } = parsed;
    let unparseable_reason = match &outcome {
        ReviewOutcome::Unparseable { reason } => Some(format!("unparseable reviewer response: {reason}")),
        _ => None,
    };

    let mut pool: Vec<Option<ValidationVerdict>> = response.verdicts.into_iter().map(Some).collect();
    let names_match = |v: &ValidationVerdict, c: &ToolCandidate| {
        v.tool_name.trim().eq_ignore_ascii_case(&c.name) || v.tool_name.trim().eq_ignore_ascii_case(&c.matched_text)
    };

    let verdicts = candidates
        .iter()
        .map(|candidate| {
            if let Some(reason) = &unparseable_reason {
                return ValidationVerdict::uncertain(&candidate.name, candidate.tool_type, reason.clone());
            }
            let slot = pool
                .iter()
                .position(|v| v.as_ref().is_some_and(|v| v.tool_type == candidate.tool_type && names_match(v, candidate)))
                .or_else(|| pool.iter().position(|v| v.as_ref().is_some_and(|v| names_match(v, candidate))));
            match slot.and_then(|i| pool[i].take()) {
                Some(mut verdict) => {
                    verdict.tool_name.clone_from(&candidate.name);
                    verdict.tool_type = candidate.tool_type;
                    verdict.confidence = clamp_confidence(verdict.confidence);
                    verdict
                }
                None => ValidationVerdict::uncertain(&candidate.name, candidate.tool_type, NO_VERDICT_REASON),
            }
        })
        .collect();

    let unmatched = pool.iter().flatten().count();
    if unmatched > 0 {
        tracing::debug!(%pmid, unmatched, "reviewer verdicts for tools that were not candidates; ignored");
    }

    VerdictDocument {
        pmid: pmid.to_string(),
        outcome,
        publication_type: response.publication_type,
        verdicts,
        missed_tools: response.missed_tools,
        pattern_suggestions: response.suggested_patterns,
        reviewed_at,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use pretty_assertions::assert_eq;
    use tm_core::{MatchKind, Section, ToolType, Verdict};

    fn candidate(name: &str, tool_type: ToolType) -> ToolCandidate {
        ToolCandidate {
            name: name.into(),
            matched_text: name.to_lowercase(),
            tool_type,
            section: Section::Methods,
            context: String::new(),
            confidence: 0.95,
            match_kind: MatchKind::Literal,
            is_development: false,
            is_established: false,
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn skipped_candidates_become_uncertain() {
        let registry = SchemaRegistry::new();
        let text = r#"{"verdicts": [
            {"tool_name": "IMAGEJ", "tool_type": "computational_tool", "verdict": "accept",
             "confidence": 1.3, "reasoning": "Used for quantification."}
        ]}"#;
        let parsed = parse_verdict_response(&registry, text);
        let candidates = [
            candidate("ImageJ", ToolType::ComputationalTool),
            candidate("PedsQL", ToolType::ClinicalAssessmentTool),
        ];
        let document = reconcile("1", &candidates, parsed, Utc::now());

        assert_eq!(document.verdicts.len(), 2);
        assert_eq!(document.verdicts[0].tool_name, "ImageJ");
        assert_eq!(document.verdicts[0].verdict, Verdict::Accept);
        assert!((document.verdicts[0].confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(document.verdicts[1].verdict, Verdict::Uncertain);
        assert_eq!(document.verdicts[1].reasoning, NO_VERDICT_REASON);
    }

    #[test]
    fn unparseable_response_makes_every_candidate_uncertain() {
        let registry = SchemaRegistry::new();
        let parsed = parse_verdict_response(&registry, "I am unable to review this paper.");
        let candidates = [candidate("ImageJ", ToolType::ComputationalTool)];
        let document = reconcile("1", &candidates, parsed, Utc::now());

        assert!(document.outcome.is_unparseable());
        assert_eq!(document.verdicts[0].verdict, Verdict::Uncertain);
        assert!(document.verdicts[0].reasoning.starts_with("unparseable reviewer response"));
        assert_eq!(document.verdicts[0].recommended_action, "manual review");
    }

    #[test]
    fn name_match_falls_back_across_types() {
        let registry = SchemaRegistry::new();
        let text = r#"{"verdicts": [
            {"tool_name": "Nf1+/-", "tool_type": "genetic_reagent", "verdict": "reject",
             "confidence": 0.8, "reasoning": "Gene name only."}
        ]}"#;
        let parsed = parse_verdict_response(&registry, text);
        let document = reconcile("1", &[candidate("Nf1+/-", ToolType::AnimalModel)], parsed, Utc::now());
        assert_eq!(document.verdicts[0].verdict, Verdict::Reject);
        assert_eq!(document.verdicts[0].tool_type, ToolType::AnimalModel);
    }
}
