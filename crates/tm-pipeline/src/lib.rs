//! # tm-pipeline
//!
//! The stages of a toolmine run and the driver that chains them.
//!
//! - [`ScreeningGate`]: title and abstract screening with per-stage caches
//! - [`budget`]: the timeout budgeter and the deferred-work artifact
//! - [`mining`]: cache-first text acquisition, extraction, classification
//! - [`ValidationOrchestrator`] and [`ObservationPhase`]: reviewer calls on a
//!   bounded worker pool with skip/force logic
//! - [`QualityFilter`]: completeness scoring and output tiers
//! - [`PatternFeedback`]: learned patterns for the next run
//! - [`Pipeline`]: the run driver writing every artifact

pub mod budget;
mod error;
pub mod feedback;
pub mod fetch;
pub mod mining;
pub mod observations;
pub mod outputs;
mod persist;
mod pool;
pub mod quality;
pub mod requests;
pub mod run;
pub mod screening;
pub mod summary;
pub mod validation;

pub use budget::{BudgetInput, BudgetPlan, DEFERRED_FILE};
pub use error::PipelineError;
pub use feedback::{FeedbackReport, PatternFeedback, ReviewItem, SourcedSuggestion};
pub use fetch::{FetchOutcome, TextFetcher};
pub use mining::{MiningReport, PublicationWork};
pub use observations::{ObservationPhase, ObservationResult, ObservationWork};
pub use outputs::{OutputWriter, strip_tracking, strip_tracking_columns};
pub use quality::{AuditRecord, Disposition, QualityFilter, QualityReport, ToolRecord};
pub use run::{Pipeline, RunObserver, RunOutcome, RunStage, Silent};
pub use screening::{ScreeningDecision, ScreeningExclusion, ScreeningGate, ScreeningReport, ScreeningStage, ScreeningStats};
pub use summary::{RunSummary, measured_rate};
pub use validation::{ReviewStatus, ValidationOrchestrator, ValidationResult, reconcile};
