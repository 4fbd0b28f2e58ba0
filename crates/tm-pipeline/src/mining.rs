//! Candidate mining over the budgeted work list.
//!
//! Sequential: for each publication the `minimal`
//! tier is made available through the cache, candidates are extracted and
//! deduplicated, then classified as development or usage.

use std::collections::{BTreeSet, HashMap};

use tm_core::publication::Publication;
use tm_core::tools::ToolCandidate;
use tm_core::{CacheTier, ToolType};
use tm_extract::{ContextClassifier, Extractor};

use crate::fetch::{FetchOutcome, TextFetcher};

/// A publication and the candidates mined from it.
#[derive(Debug, Clone)]
pub struct PublicationWork {
    pub publication: Publication,
    pub candidates: Vec<ToolCandidate>,
    /// Tool types the abstract screen expected, passed on to the reviewer.
    pub expected_types: Vec<ToolType>,
}

#[derive(Debug, Default)]
pub struct MiningReport {
    pub with_candidates: Vec<PublicationWork>,
    /// Ids of publications that yielded no candidate.
    pub without_candidates: Vec<String>,
    /// Ids whose text fetch failed after retries.
    pub failed: Vec<String>,
    /// Publications mined from title and abstract only.
    pub text_unavailable: usize,
    /// Tool types with no patterns at all.
    pub coverage_gaps: BTreeSet<ToolType>,
    pub candidates: usize,
}

pub async fn mine(
    fetcher: &TextFetcher,
    extractor: &Extractor,
    classifier: &ContextClassifier,
    publications: Vec<Publication>,
    expected_types: &HashMap<String, Vec<ToolType>>,
) -> MiningReport {
    let mut report = MiningReport::default();
    for mut publication in publications {
        match fetcher.ensure_tier(&mut publication, CacheTier::Minimal).await {
            Ok(FetchOutcome::Unavailable) => {
                tracing::debug!(pmid = %publication.pmid, "coverage gap: no full text; mining title and abstract");
                report.text_unavailable += 1;
            }
            Ok(_) => {}
            Err(error) => {
                tracing::error!(pmid = %publication.pmid, %error, "text fetch failed; publication skipped");
                report.failed.push(publication.pmid);
                continue;
            }
        }

        let mut extraction = extractor.extract(&publication);
        report.coverage_gaps.extend(extraction.coverage_gaps.iter().copied());
        if extraction.candidates.is_empty() {
            report.without_candidates.push(publication.pmid);
            continue;
        }
        classifier.apply(&mut extraction.candidates, &publication.full_text());
        report.candidates += extraction.candidates.len();
        tracing::debug!(pmid = %publication.pmid, candidates = extraction.candidates.len(), "candidates mined");

        let expected = expected_types.get(&publication.pmid).cloned().unwrap_or_default();
        report.with_candidates.push(PublicationWork {
            publication,
            candidates: extraction.candidates,
            expected_types: expected,
        });
    }
    tracing::info!(
        with_candidates = report.with_candidates.len(),
        without_candidates = report.without_candidates.len(),
        failed = report.failed.len(),
        candidates = report.candidates,
        "mining complete"
    );
    report
}
