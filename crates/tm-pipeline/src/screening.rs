//! Screening gate: title stage, then abstract stage.
//!
//! ```text
//! publications ─► title (cached in screening/title.json)
//!                   │ research, or non_research below threshold
//!                   ▼
//!                 abstract (cached in screening/abstract.json)
//!                   │ likely_tools, or unlikely below threshold,
//!                   │ or no obtainable abstract
//!                   ▼
//!                 passed
//! ```
//!
//! A publication is excluded only by a negative verdict at or above the
//! screening threshold. Items a response leaves out pass through and are
//! screened again next run. A batch whose call fails after retries marks
//! its publications failed; they are neither passed nor excluded.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tm_clients::{ClientError, ReviewService};
use tm_core::documents::{AbstractLabel, AbstractScreeningEntry, TitleLabel, TitleScreeningEntry, clamp_confidence};
use tm_core::publication::Publication;
use tm_core::{CacheTier, ToolType};
use tm_schema::SchemaRegistry;
use tm_schema::parse_list_response;
use tm_schema::registry::{ABSTRACT_SCREENING_RESPONSE, TITLE_SCREENING_RESPONSE};

use crate::error::PipelineError;
use crate::fetch::TextFetcher;
use crate::persist::{read_json, write_json_atomic};
use crate::requests;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningStage {
    Title,
    Abstract,
}

impl ScreeningStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Abstract => "abstract",
        }
    }

    const fn file_name(self) -> &'static str {
        match self {
            Self::Title => "title.json",
            Self::Abstract => "abstract.json",
        }
    }
}

impl std::fmt::Display for ScreeningStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cached stage verdict for one publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningDecision {
    /// Label as the reviewer gave it (`research`, `unlikely`, ...).
    pub verdict: String,
    /// Whether the label argues for exclusion.
    pub negative: bool,
    pub confidence: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub tool_types: Vec<ToolType>,
    pub screened_at: DateTime<Utc>,
}

impl ScreeningDecision {
    /// Exclusion is decided at read time so a changed threshold applies to
    /// cached decisions too.
    #[must_use]
    pub fn excludes(&self, threshold: f64) -> bool {
        self.negative && self.confidence >= threshold
    }

    fn from_title(entry: TitleScreeningEntry, now: DateTime<Utc>) -> Self {
        Self {
            verdict: match entry.verdict {
                TitleLabel::Research => "research",
                TitleLabel::NonResearch => "non_research",
            }
            .to_string(),
            negative: entry.verdict == TitleLabel::NonResearch,
            confidence: clamp_confidence(entry.confidence),
            reason: entry.reason,
            tool_types: Vec::new(),
            screened_at: now,
        }
    }

    fn from_abstract(entry: AbstractScreeningEntry, now: DateTime<Utc>) -> Self {
        Self {
            verdict: match entry.verdict {
                AbstractLabel::LikelyTools => "likely_tools",
                AbstractLabel::Unlikely => "unlikely",
            }
            .to_string(),
            negative: entry.verdict == AbstractLabel::Unlikely,
            confidence: clamp_confidence(entry.confidence),
            reason: entry.reason,
            tool_types: entry.tool_types,
            screened_at: now,
        }
    }
}

/// Per-stage decisions persisted as one JSON object keyed by publication id.
#[derive(Debug)]
pub struct ScreeningCache {
    path: PathBuf,
    decisions: BTreeMap<String, ScreeningDecision>,
}

impl ScreeningCache {
    /// Load the stage cache; a missing or corrupt file starts empty.
    #[must_use]
    pub fn load(dir: &Path, stage: ScreeningStage) -> Self {
        let path = dir.join(stage.file_name());
        let decisions = read_json(&path).unwrap_or_default();
        Self { path, decisions }
    }

    #[must_use]
    pub fn get(&self, pmid: &str) -> Option<&ScreeningDecision> {
        self.decisions.get(pmid)
    }

    pub fn insert(&mut self, pmid: impl Into<String>, decision: ScreeningDecision) {
        self.decisions.insert(pmid.into(), decision);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// Write the cache atomically.
    ///
    /// # Errors
    ///
    /// Returns an I/O or JSON error; the previous file is left intact.
    pub fn save(&self) -> Result<(), PipelineError> {
        write_json_atomic(&self.path, &self.decisions)
    }
}

/// One row of `screening_log.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningExclusion {
    pub pmid: String,
    pub stage: ScreeningStage,
    pub verdict: String,
    pub confidence: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningStats {
    /// Publications entering the gate.
    pub screened: usize,
    pub title_excluded: usize,
    pub abstract_excluded: usize,
    /// Decisions answered from the stage caches.
    pub from_cache: usize,
    /// Items a response left out; they passed unscreened.
    pub missing_from_response: usize,
    /// Passed the abstract stage without an abstract.
    pub no_abstract: usize,
    pub failed: usize,
    pub passed: usize,
}

#[derive(Debug, Default)]
pub struct ScreeningReport {
    /// Publications passing both stages, in input order.
    pub passed: Vec<Publication>,
    pub exclusions: Vec<ScreeningExclusion>,
    /// Ids whose screening call failed after retries.
    pub failed: Vec<String>,
    /// Tool types the abstract stage expects, by publication id.
    pub expected_types: HashMap<String, Vec<ToolType>>,
    pub stats: ScreeningStats,
}

pub struct ScreeningGate {
    service: Arc<dyn ReviewService>,
    registry: Arc<SchemaRegistry>,
    fetcher: TextFetcher,
    dir: PathBuf,
    batch_size: usize,
    threshold: f64,
}

impl ScreeningGate {
    #[must_use]
    pub fn new(
        service: Arc<dyn ReviewService>,
        registry: Arc<SchemaRegistry>,
        fetcher: TextFetcher,
        dir: PathBuf,
        batch_size: usize,
        threshold: f64,
    ) -> Self {
        Self {
            service,
            registry,
            fetcher,
            dir,
            batch_size: batch_size.max(1),
            threshold,
        }
    }

    /// Everything passes without a reviewer call.
    #[must_use]
    pub fn bypass(publications: Vec<Publication>) -> ScreeningReport {
        let stats = ScreeningStats {
            screened: publications.len(),
            passed: publications.len(),
            ..ScreeningStats::default()
        };
        ScreeningReport {
            passed: publications,
            stats,
            ..ScreeningReport::default()
        }
    }

    /// Run both stages.
    ///
    /// # Errors
    ///
    /// Returns an error only if a stage cache cannot be written.
    pub async fn screen(&self, publications: Vec<Publication>) -> Result<ScreeningReport, PipelineError> {
        let mut report = ScreeningReport {
            stats: ScreeningStats {
                screened: publications.len(),
                ..ScreeningStats::default()
            },
            ..ScreeningReport::default()
        };

        let after_title = self.title_stage(publications, &mut report).await?;
        tracing::info!(
            stage = "title",
            passed = after_title.len(),
            excluded = report.stats.title_excluded,
            "screening stage complete"
        );

        let passed = self.abstract_stage(after_title, &mut report).await?;
        report.stats.passed = passed.len();
        report.stats.failed = report.failed.len();
        report.passed = passed;
        tracing::info!(
            stage = "abstract",
            passed = report.stats.passed,
            excluded = report.stats.abstract_excluded,
            failed = report.stats.failed,
            "screening stage complete"
        );
        Ok(report)
    }

    async fn title_stage(
        &self,
        publications: Vec<Publication>,
        report: &mut ScreeningReport,
    ) -> Result<Vec<Publication>, PipelineError> {
        let stage = ScreeningStage::Title;
        let mut cache = ScreeningCache::load(&self.dir, stage);
        let pending: Vec<&Publication> = publications
            .iter()
            .filter(|p| cache.get(&p.pmid).is_none())
            .collect();
        report.stats.from_cache += publications.len() - pending.len();

        let mut failed = HashSet::new();
        for batch in pending.chunks(self.batch_size) {
            let request = requests::title_screening(&self.registry, batch);
            let decisions = self
                .service
                .complete(&request)
                .await
                .map(|text| {
                    let now = Utc::now();
                    parse_list_response::<TitleScreeningEntry>(&self.registry, TITLE_SCREENING_RESPONSE, "results", &text)
                        .items
                        .into_iter()
                        .map(|entry| (entry.pmid.trim().to_string(), ScreeningDecision::from_title(entry, now)))
                        .collect::<HashMap<_, _>>()
                });
            let ids: Vec<&str> = batch.iter().map(|p| p.pmid.as_str()).collect();
            Self::record_batch(stage, &ids, decisions, &mut cache, &mut failed, report)?;
        }

        Ok(self.partition(stage, publications, &cache, &failed, report))
    }

    async fn abstract_stage(
        &self,
        publications: Vec<Publication>,
        report: &mut ScreeningReport,
    ) -> Result<Vec<Publication>, PipelineError> {
        let stage = ScreeningStage::Abstract;
        let mut cache = ScreeningCache::load(&self.dir, stage);
        let mut publications = publications;
        let mut failed = HashSet::new();
        let mut no_abstract = HashSet::new();

        for publication in &mut publications {
            if cache.get(&publication.pmid).is_some() {
                report.stats.from_cache += 1;
                continue;
            }
            if publication.abstract_or_section().is_some() {
                continue;
            }
            match self.fetcher.ensure_tier(publication, CacheTier::Minimal).await {
                Ok(_) if publication.abstract_or_section().is_some() => {}
                Ok(_) => {
                    tracing::warn!(pmid = %publication.pmid, "coverage gap: no abstract; passing without abstract screening");
                    no_abstract.insert(publication.pmid.clone());
                }
                Err(error) => {
                    tracing::error!(pmid = %publication.pmid, %error, "abstract fetch failed");
                    failed.insert(publication.pmid.clone());
                }
            }
        }
        report.stats.no_abstract += no_abstract.len();

        let pending: Vec<(&Publication, &str)> = publications
            .iter()
            .filter(|p| cache.get(&p.pmid).is_none() && !failed.contains(&p.pmid))
            .filter_map(|p| p.abstract_or_section().map(|text| (p, text)))
            .collect();

        for batch in pending.chunks(self.batch_size) {
            let request = requests::abstract_screening(&self.registry, batch);
            let decisions = self
                .service
                .complete(&request)
                .await
                .map(|text| {
                    let now = Utc::now();
                    parse_list_response::<AbstractScreeningEntry>(
                        &self.registry,
                        ABSTRACT_SCREENING_RESPONSE,
                        "results",
                        &text,
                    )
                    .items
                    .into_iter()
                    .map(|entry| (entry.pmid.trim().to_string(), ScreeningDecision::from_abstract(entry, now)))
                    .collect::<HashMap<_, _>>()
                });
            let ids: Vec<&str> = batch.iter().map(|(p, _)| p.pmid.as_str()).collect();
            Self::record_batch(stage, &ids, decisions, &mut cache, &mut failed, report)?;
        }

        for publication in &publications {
            if let Some(decision) = cache.get(&publication.pmid) {
                if !decision.tool_types.is_empty() {
                    report
                        .expected_types
                        .insert(publication.pmid.clone(), decision.tool_types.clone());
                }
            }
        }
        Ok(self.partition(stage, publications, &cache, &failed, report))
    }

    /// Store one batch's decisions, or mark the batch failed.
    fn record_batch(
        stage: ScreeningStage,
        ids: &[&str],
        decisions: Result<HashMap<String, ScreeningDecision>, ClientError>,
        cache: &mut ScreeningCache,
        failed: &mut HashSet<String>,
        report: &mut ScreeningReport,
    ) -> Result<(), PipelineError> {
        match decisions {
            Ok(mut decisions) => {
                for id in ids {
                    match decisions.remove(*id) {
                        Some(decision) => cache.insert(*id, decision),
                        None => {
                            tracing::warn!(pmid = id, %stage, "publication missing from screening response; passing through");
                            report.stats.missing_from_response += 1;
                        }
                    }
                }
                cache.save()
            }
            Err(error) => {
                tracing::error!(%stage, batch = ids.len(), %error, "screening batch failed; marking publications failed");
                failed.extend(ids.iter().map(|id| (*id).to_string()));
                Ok(())
            }
        }
    }

    /// Split into passing publications, recording exclusions and failures.
    fn partition(
        &self,
        stage: ScreeningStage,
        publications: Vec<Publication>,
        cache: &ScreeningCache,
        failed: &HashSet<String>,
        report: &mut ScreeningReport,
    ) -> Vec<Publication> {
        let mut passed = Vec::with_capacity(publications.len());
        for publication in publications {
            if failed.contains(&publication.pmid) {
                report.failed.push(publication.pmid);
                continue;
            }
            match cache.get(&publication.pmid) {
                Some(decision) if decision.excludes(self.threshold) => {
                    match stage {
                        ScreeningStage::Title => report.stats.title_excluded += 1,
                        ScreeningStage::Abstract => report.stats.abstract_excluded += 1,
                    }
                    tracing::debug!(pmid = %publication.pmid, %stage, verdict = %decision.verdict, "excluded");
                    report.exclusions.push(ScreeningExclusion {
                        pmid: publication.pmid,
                        stage,
                        verdict: decision.verdict.clone(),
                        confidence: decision.confidence,
                        reason: decision.reason.clone(),
                    });
                }
                _ => passed.push(publication),
            }
        }
        passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_confidence_negative_does_not_exclude() {
        let decision = ScreeningDecision {
            verdict: "non_research".into(),
            negative: true,
            confidence: 0.55,
            reason: "maybe a review".into(),
            tool_types: Vec::new(),
            screened_at: Utc::now(),
        };
        assert!(!decision.excludes(0.6));
        assert!(decision.excludes(0.5));
    }

    #[test]
    fn cache_survives_reload_and_ignores_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ScreeningCache::load(dir.path(), ScreeningStage::Title);
        assert!(cache.is_empty());
        cache.insert(
            "1",
            ScreeningDecision {
                verdict: "research".into(),
                negative: false,
                confidence: 0.9,
                reason: String::new(),
                tool_types: Vec::new(),
                screened_at: Utc::now(),
            },
        );
        cache.save().unwrap();
        assert_eq!(ScreeningCache::load(dir.path(), ScreeningStage::Title).len(), 1);

        std::fs::write(dir.path().join("abstract.json"), "{not json").unwrap();
        assert!(ScreeningCache::load(dir.path(), ScreeningStage::Abstract).is_empty());
    }
}
