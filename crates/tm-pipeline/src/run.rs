//! The run driver.
//!
//! ```text
//! index ─► screening ─► budget ─► mining ─► validation ─► observations
//!                                                  │
//!                          quality filter ◄────────┘
//!                          pattern feedback ─► artifacts + summary
//! ```
//!
//! Startup fails only on configuration the run cannot work with (no usable
//! patterns, bad thresholds, zero workers). Everything after that is
//! per-publication: failures are logged and counted, never returned.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tm_cache::TextCacheStore;
use tm_clients::{FullTextSource, RetryPolicy, ReviewService, fulltext_source_from_config, read_index, review_service_from_config};
use tm_config::ToolmineConfig;
use tm_core::documents::{MissedToolCandidate, VerdictDocument};
use tm_core::observation::Observation;
use tm_core::publication::Publication;
use tm_core::run::{DeferredWorkList, RunCounts};
use tm_core::{ToolType, Verdict};
use tm_extract::{ContextClassifier, Extractor, PatternSet};
use tm_schema::SchemaRegistry;

use crate::budget::{self, BudgetInput};
use crate::error::PipelineError;
use crate::feedback::{self, FeedbackReport, PatternFeedback};
use crate::fetch::TextFetcher;
use crate::mining::{self, MiningReport, PublicationWork};
use crate::observations::{ObservationPhase, ObservationWork, eligible_tools};
use crate::outputs::OutputWriter;
use crate::persist::read_json;
use crate::quality::{QualityFilter, QualityReport};
use crate::screening::{ScreeningGate, ScreeningReport};
use crate::summary::{
    self, BudgetSummary, Funnel, PatternSummary, RunSummary, Timing, ToolTypeCounts,
};
use crate::validation::{ReviewStatus, ValidationOrchestrator, ValidationResult};

/// Stages reported to a [`RunObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Screening,
    Budget,
    Mining,
    Validation,
    Observations,
    Outputs,
}

impl RunStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Screening => "screening",
            Self::Budget => "budget",
            Self::Mining => "mining",
            Self::Validation => "validation",
            Self::Observations => "observations",
            Self::Outputs => "outputs",
        }
    }
}

/// Hook for progress displays.
pub trait RunObserver: Send + Sync {
    /// A stage is starting with `items` publications.
    fn stage(&self, stage: RunStage, items: usize);
}

/// Observer that ignores everything.
pub struct Silent;

impl RunObserver for Silent {
    fn stage(&self, _stage: RunStage, _items: usize) {}
}

/// What a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub quality: QualityReport,
    pub feedback: FeedbackReport,
    pub deferred: DeferredWorkList,
    pub output_dir: PathBuf,
}

pub struct Pipeline {
    config: ToolmineConfig,
    service: Arc<dyn ReviewService>,
    source: Arc<dyn FullTextSource>,
    registry: Arc<SchemaRegistry>,
    observer: Arc<dyn RunObserver>,
}

impl Pipeline {
    /// A pipeline over explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] when the configuration is unusable.
    pub fn new(
        config: ToolmineConfig,
        service: Arc<dyn ReviewService>,
        source: Arc<dyn FullTextSource>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            service,
            source,
            registry: Arc::new(SchemaRegistry::new()),
            observer: Arc::new(Silent),
        })
    }

    /// A pipeline talking to the configured review service and full-text
    /// source.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid or the review
    /// service has no credentials.
    pub fn from_config(config: ToolmineConfig) -> Result<Self, PipelineError> {
        let service = review_service_from_config(config.require_review()?)?;
        let source = fulltext_source_from_config(&config.fulltext)?;
        Self::new(config, service, source)
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ToolmineConfig {
        &self.config
    }

    /// Run over the configured publication index.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run`]; also fails when the index cannot be opened.
    pub async fn run_from_index(&self) -> Result<RunOutcome, PipelineError> {
        let path = self.config.paths.publications_path();
        let (publications, index) = read_index(&path)?;
        tracing::info!(
            path = %path.display(),
            publications = index.publications,
            merged_duplicates = index.merged_duplicates,
            skipped_invalid = index.skipped_invalid,
            "publication index loaded"
        );
        self.run(publications).await
    }

    /// Run every stage over `publications`.
    ///
    /// # Errors
    ///
    /// Returns an error for unusable patterns or configuration, or when an
    /// artifact cannot be written.
    pub async fn run(&self, publications: Vec<Publication>) -> Result<RunOutcome, PipelineError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let paths = &self.config.paths;
        let thresholds = &self.config.thresholds;
        let output_dir = paths.output_dir();
        let out = OutputWriter::new(&output_dir);

        let patterns_path = paths.patterns_path();
        let patterns = PatternSet::load_or_builtin(&patterns_path)?;
        patterns.ensure_usable()?;
        let extractor = Extractor::new(&patterns, thresholds.fuzzy_match)?;
        let classifier = ContextClassifier::new(&patterns);
        tracing::info!(version = patterns.version, path = %patterns_path.display(), "pattern set loaded");

        let fetcher = TextFetcher::new(
            TextCacheStore::open(paths.cache_dir())?,
            Arc::clone(&self.source),
            RetryPolicy::from_config(&self.config.review),
        );
        let indexed = publications.len();

        self.observer.stage(RunStage::Screening, indexed);
        let screening = self.screen(&fetcher, publications).await?;

        self.observer.stage(RunStage::Budget, screening.passed.len());
        let (to_process, budget_summary, deferred) =
            self.budget(screening.passed.clone(), clock.elapsed().as_secs_f64() / 60.0)?;
        budget::write_deferred(&output_dir, &deferred)?;

        let processing = Instant::now();
        self.observer.stage(RunStage::Mining, to_process.len());
        let budgeted = to_process.len();
        let mined = mining::mine(&fetcher, &extractor, &classifier, to_process, &screening.expected_types).await;

        self.observer.stage(RunStage::Validation, mined.with_candidates.len());
        let orchestrator = ValidationOrchestrator::new(
            Arc::clone(&self.service),
            Arc::clone(&self.registry),
            paths.verdicts_dir(),
            self.config.run.force_rerun,
            self.config.run.parallel_workers,
        );
        let validated = orchestrator.validate_all(mined.with_candidates.clone()).await;

        let (observations, observation_failures) = self.observations(&fetcher, &validated).await;
        let processing_minutes = processing.elapsed().as_secs_f64() / 60.0;

        let reviewed: Vec<(&PublicationWork, &VerdictDocument)> = validated
            .iter()
            .filter_map(|r| Some((r.work.as_ref()?, r.document.as_ref()?)))
            .collect();
        let quality = QualityFilter::from_thresholds(thresholds).assess(reviewed.iter().copied());

        // Only this run's reviews feed the loop; reused documents already did.
        let fresh = validated
            .iter()
            .filter(|r| r.status == ReviewStatus::Reviewed)
            .filter_map(|r| r.document.as_ref());
        let suggestions = feedback::collect_suggestions(fresh);
        let pattern_feedback = PatternFeedback::from_thresholds(thresholds);
        let (next_patterns, feedback_report) = pattern_feedback.apply(&patterns, &suggestions, Utc::now());

        self.observer.stage(RunStage::Outputs, quality.validated.len());
        let missed: Vec<(String, MissedToolCandidate)> = reviewed
            .iter()
            .flat_map(|(_, doc)| doc.missed_tools.iter().map(|m| (doc.pmid.clone(), m.clone())))
            .collect();
        out.write_quality(&quality)?;
        out.write_observations(&observations)?;
        out.write_missed_tools(&missed)?;
        out.write_screening_log(&screening.exclusions)?;
        out.write_text(feedback::REVIEW_FILE, &feedback::render_review(&feedback_report, &pattern_feedback))?;
        if feedback_report.changed() {
            next_patterns.save(&patterns_path)?;
            tracing::info!(version = next_patterns.version, path = %patterns_path.display(), "pattern set updated");
        }

        let counts = run_counts(&screening, &mined, &validated, deferred.len());
        let mut coverage_gaps: Vec<String> = mined
            .coverage_gaps
            .iter()
            .map(|t| format!("no patterns for {}", t.display_name()))
            .collect();
        if mined.text_unavailable > 0 {
            coverage_gaps.push(format!("{} publications mined without full text", mined.text_unavailable));
        }
        if screening.stats.no_abstract > 0 {
            coverage_gaps.push(format!(
                "{} publications passed without abstract screening",
                screening.stats.no_abstract
            ));
        }
        if observation_failures > 0 {
            coverage_gaps.push(format!("observation extraction failed for {observation_failures} publications"));
        }

        let summary = RunSummary {
            counts,
            funnel: Funnel {
                indexed,
                passed_screening: screening.passed.len(),
                budgeted,
                with_candidates: mined.with_candidates.len(),
                without_candidates: mined.without_candidates.len(),
                text_unavailable: mined.text_unavailable,
            },
            screening: screening.stats,
            budget: budget_summary,
            by_verdict: by_verdict(&reviewed),
            by_publication_type: by_publication_type(&reviewed),
            by_tool_type: by_tool_type(&reviewed, &quality),
            observations: observations.len(),
            patterns: PatternSummary {
                previous_version: feedback_report.previous_version,
                version: feedback_report.version,
                merged: feedback_report.merged.len(),
                review: feedback_report.review.len(),
                discarded: feedback_report.discarded,
                duplicates: feedback_report.duplicates,
            },
            coverage_gaps,
            timing: Timing::new(started_at, Utc::now(), processing_minutes, counts.processed),
        };
        crate::persist::write_json_atomic(&output_dir.join(summary::SUMMARY_FILE), &summary)?;
        out.write_text(summary::REPORT_FILE, &summary::render_report(&summary))?;

        tracing::info!(
            processed = counts.processed,
            skipped_cached = counts.skipped_cached,
            deferred = counts.deferred,
            failed = counts.failed,
            validated = quality.validated.len(),
            "run complete"
        );
        Ok(RunOutcome {
            summary,
            quality,
            feedback: feedback_report,
            deferred,
            output_dir,
        })
    }

    async fn screen(&self, fetcher: &TextFetcher, publications: Vec<Publication>) -> Result<ScreeningReport, PipelineError> {
        if self.config.run.skip_screening {
            tracing::info!(publications = publications.len(), "screening skipped by configuration");
            return Ok(ScreeningGate::bypass(publications));
        }
        let gate = ScreeningGate::new(
            Arc::clone(&self.service),
            Arc::clone(&self.registry),
            fetcher.clone(),
            self.config.paths.screening_dir(),
            self.config.run.screening_batch_size,
            self.config.thresholds.screening_min_confidence,
        );
        gate.screen(publications).await
    }

    /// Budget the screened list. A publication whose verdict document will be
    /// reused and whose observation document exists (or is not needed) costs
    /// no service call and is not budgeted.
    fn budget(
        &self,
        publications: Vec<Publication>,
        elapsed_minutes: f64,
    ) -> Result<(Vec<Publication>, BudgetSummary, DeferredWorkList), PipelineError> {
        let (reusable, fresh): (Vec<Publication>, Vec<Publication>) =
            publications.into_iter().partition(|p| self.fully_reviewed(&p.pmid));

        let measured = if self.config.budget.use_measured_rate {
            summary::measured_rate(&self.config.paths.output_dir())
        } else {
            None
        };
        let input = BudgetInput::from_config(&self.config.budget, elapsed_minutes, measured);
        let plan = budget::plan(fresh, input)?;
        let summary = BudgetSummary {
            available_minutes: input.available_minutes(),
            minutes_per_publication: input.minutes_per_publication,
            max_publications: plan.max_publications,
            to_process: plan.to_process.len(),
            deferred: plan.deferred.len(),
        };
        if !reusable.is_empty() {
            tracing::info!(reusable = reusable.len(), "publications with existing verdicts bypass the budget");
        }
        let mut to_process = reusable;
        to_process.extend(plan.to_process);
        Ok((to_process, summary, plan.deferred))
    }

    /// Whether a rerun of `pmid` would make no review call at all.
    fn fully_reviewed(&self, pmid: &str) -> bool {
        if self.config.run.force_rerun {
            return false;
        }
        let key = format!("{}.json", tm_cache::sanitize_key(pmid));
        let Some(document) = read_json::<VerdictDocument>(&self.config.paths.verdicts_dir().join(&key)) else {
            return false;
        };
        !self.config.run.extract_observations
            || self.config.paths.observations_dir().join(&key).is_file()
            || eligible_tools(&document, self.config.thresholds.observation_floor).is_empty()
    }

    /// Observation extraction for confidently accepted tools. Returns the
    /// observations with their pmids, and the number of failed publications.
    async fn observations(&self, fetcher: &TextFetcher, validated: &[ValidationResult]) -> (Vec<(String, Observation)>, usize) {
        if !self.config.run.extract_observations {
            return (Vec::new(), 0);
        }
        let floor = self.config.thresholds.observation_floor;
        let works: Vec<ObservationWork> = validated
            .iter()
            .filter_map(|result| {
                let work = result.work.as_ref()?;
                let tools = eligible_tools(result.document.as_ref()?, floor);
                (!tools.is_empty()).then(|| ObservationWork {
                    publication: work.publication.clone(),
                    tools,
                })
            })
            .collect();
        if works.is_empty() {
            return (Vec::new(), 0);
        }

        self.observer.stage(RunStage::Observations, works.len());
        let phase = ObservationPhase::new(
            Arc::clone(&self.service),
            Arc::clone(&self.registry),
            fetcher.clone(),
            self.config.paths.observations_dir(),
            self.config.run.force_rerun,
            self.config.run.parallel_workers,
        );
        let results = phase.extract_all(works).await;
        let failures = results
            .iter()
            .filter(|r| matches!(r.status, ReviewStatus::Failed(_)))
            .count();
        let observations = results
            .into_iter()
            .filter_map(|r| r.document)
            .flat_map(|doc| {
                let pmid = doc.pmid;
                doc.observations.into_iter().map(move |o| (pmid.clone(), o))
            })
            .collect();
        (observations, failures)
    }
}

fn run_counts(screening: &ScreeningReport, mined: &MiningReport, validated: &[ValidationResult], deferred: usize) -> RunCounts {
    let mut counts = RunCounts {
        processed: mined.without_candidates.len(),
        deferred,
        failed: screening.failed.len() + mined.failed.len(),
        ..RunCounts::default()
    };
    for result in validated {
        match result.status {
            ReviewStatus::Reviewed => counts.processed += 1,
            ReviewStatus::Reused => counts.skipped_cached += 1,
            ReviewStatus::Failed(_) => counts.failed += 1,
        }
    }
    counts
}

fn by_verdict(reviewed: &[(&PublicationWork, &VerdictDocument)]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = [Verdict::Accept, Verdict::Reject, Verdict::Uncertain]
        .into_iter()
        .map(|v| (v.as_str().to_string(), 0))
        .collect();
    for (_, document) in reviewed {
        for verdict in &document.verdicts {
            *counts.entry(verdict.verdict.as_str().to_string()).or_default() += 1;
        }
    }
    counts
}

fn by_publication_type(reviewed: &[(&PublicationWork, &VerdictDocument)]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for (_, document) in reviewed {
        let kind = document
            .publication_type
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or("unknown")
            .to_lowercase();
        *counts.entry(kind).or_default() += 1;
    }
    counts
}

fn by_tool_type(
    reviewed: &[(&PublicationWork, &VerdictDocument)],
    quality: &QualityReport,
) -> BTreeMap<ToolType, ToolTypeCounts> {
    let mut counts: BTreeMap<ToolType, ToolTypeCounts> =
        ToolType::ALL.into_iter().map(|t| (t, ToolTypeCounts::default())).collect();
    let mut accepted: BTreeSet<(String, ToolType, String)> = BTreeSet::new();
    for (work, document) in reviewed {
        for candidate in &work.candidates {
            counts.entry(candidate.tool_type).or_default().candidates += 1;
        }
        for verdict in document.verdicts.iter().filter(|v| v.verdict == Verdict::Accept) {
            if accepted.insert((document.pmid.clone(), verdict.tool_type, verdict.tool_name.to_lowercase())) {
                counts.entry(verdict.tool_type).or_default().accepted += 1;
            }
        }
    }
    for record in &quality.validated {
        counts.entry(record.tool_type).or_default().validated += 1;
    }
    for record in &quality.filtered {
        counts.entry(record.tool_type).or_default().filtered += 1;
    }
    counts
}
