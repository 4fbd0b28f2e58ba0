//! Timeout budgeter: how many publications fit under the wall-clock ceiling.
//!
//! ```text
//! max = floor((ceiling - margin - overhead) / minutes_per_publication)
//! ```
//!
//! `overhead` is the fixed setup cost plus the time this run has already
//! spent. When everything fits, the work list is untouched. Otherwise the
//! most recent publications go first (stable for equal years) and the rest
//! is deferred to the next run.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tm_config::BudgetConfig;
use tm_core::publication::Publication;
use tm_core::run::DeferredWorkList;

use crate::error::PipelineError;

/// File name of the deferred-work artifact in the output directory.
pub const DEFERRED_FILE: &str = "deferred_publications.txt";

/// Inputs of one budget evaluation, all in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetInput {
    pub ceiling: f64,
    pub margin: f64,
    /// Setup overhead plus time already elapsed.
    pub overhead: f64,
    pub minutes_per_publication: f64,
}

impl BudgetInput {
    /// Budget from configuration, `elapsed_minutes` into the run.
    ///
    /// `measured_rate` replaces the configured time per publication when the
    /// configuration allows it.
    #[must_use]
    pub fn from_config(config: &BudgetConfig, elapsed_minutes: f64, measured_rate: Option<f64>) -> Self {
        let minutes_per_publication = match measured_rate {
            Some(rate) if config.use_measured_rate && rate > 0.0 && rate.is_finite() => rate,
            _ => config.minutes_per_publication,
        };
        Self {
            ceiling: config.ceiling_minutes,
            margin: config.safety_margin_minutes,
            overhead: config.setup_overhead_minutes + elapsed_minutes.max(0.0),
            minutes_per_publication,
        }
    }

    /// Minutes left for publication processing (may be negative).
    #[must_use]
    pub fn available_minutes(&self) -> f64 {
        self.ceiling - self.margin - self.overhead
    }

    /// Largest count whose processing time fits the available minutes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Budget`] for a non-positive or non-finite
    /// time per publication.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn max_publications(&self) -> Result<usize, PipelineError> {
        let rate = self.minutes_per_publication;
        if !(rate > 0.0) || !rate.is_finite() {
            return Err(PipelineError::Budget(format!(
                "time per publication must be positive, got {rate}"
            )));
        }
        let available = self.available_minutes();
        if !(available > 0.0) {
            return Ok(0);
        }
        let mut max = (available / rate).floor() as usize;
        // Guard against floor() landing one above after rounding.
        while max > 0 && max as f64 * rate > available {
            max -= 1;
        }
        Ok(max)
    }
}

/// The work list after budgeting.
#[derive(Debug, Clone)]
pub struct BudgetPlan {
    pub input: BudgetInput,
    pub total: usize,
    pub max_publications: usize,
    pub to_process: Vec<Publication>,
    pub deferred: DeferredWorkList,
}

impl BudgetPlan {
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        !self.deferred.is_empty()
    }
}

/// Split `publications` into work for this run and deferred work.
///
/// # Errors
///
/// Returns [`PipelineError::Budget`] for an invalid time per publication.
pub fn plan(publications: Vec<Publication>, input: BudgetInput) -> Result<BudgetPlan, PipelineError> {
    let total = publications.len();
    let max_publications = input.max_publications()?;

    if total <= max_publications {
        tracing::info!(total, max_publications, "budget: processing all publications");
        return Ok(BudgetPlan {
            input,
            total,
            max_publications,
            to_process: publications,
            deferred: DeferredWorkList::default(),
        });
    }

    let mut ordered = publications;
    priority_order(&mut ordered);
    let rest = ordered.split_off(max_publications);
    let deferred = DeferredWorkList::new(rest.into_iter().map(|p| p.pmid));
    tracing::warn!(
        total,
        max_publications,
        deferred = deferred.len(),
        available_minutes = input.available_minutes(),
        minutes_per_publication = input.minutes_per_publication,
        "budget: truncating work list"
    );
    Ok(BudgetPlan {
        input,
        total,
        max_publications,
        to_process: ordered,
        deferred,
    })
}

/// Most recent year first; unknown years last; stable for ties.
pub fn priority_order(publications: &mut [Publication]) {
    publications.sort_by(|a, b| b.year.unwrap_or(i32::MIN).cmp(&a.year.unwrap_or(i32::MIN)));
}

/// Write `deferred_publications.txt`, replacing any previous list.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be written.
pub fn write_deferred(output_dir: &Path, deferred: &DeferredWorkList) -> Result<(), PipelineError> {
    std::fs::create_dir_all(output_dir)?;
    std::fs::write(output_dir.join(DEFERRED_FILE), deferred.to_lines())?;
    Ok(())
}

/// Read a deferred list written by a previous run; absent means empty.
#[must_use]
pub fn read_deferred(output_dir: &Path) -> DeferredWorkList {
    std::fs::read_to_string(output_dir.join(DEFERRED_FILE))
        .map(|text| DeferredWorkList::parse(&text))
        .unwrap_or_default()
}
