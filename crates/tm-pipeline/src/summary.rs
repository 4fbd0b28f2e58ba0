//! `validation_summary.json` and `validation_report.md`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tm_core::run::RunCounts;
use tm_core::ToolType;

use crate::screening::ScreeningStats;

pub const SUMMARY_FILE: &str = "validation_summary.json";
pub const REPORT_FILE: &str = "validation_report.md";

/// Where the publications of a run went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Funnel {
    pub indexed: usize,
    pub passed_screening: usize,
    pub budgeted: usize,
    pub with_candidates: usize,
    pub without_candidates: usize,
    /// Mined from title and abstract only.
    pub text_unavailable: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolTypeCounts {
    pub candidates: usize,
    pub accepted: usize,
    pub validated: usize,
    pub filtered: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub available_minutes: f64,
    pub minutes_per_publication: f64,
    pub max_publications: usize,
    pub to_process: usize,
    pub deferred: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSummary {
    pub previous_version: u32,
    pub version: u32,
    pub merged: usize,
    pub review: usize,
    pub discarded: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_minutes: f64,
    /// Minutes spent mining and reviewing.
    pub processing_minutes: f64,
    /// Processing minutes per processed publication; what the next run's
    /// budget uses when measured rates are enabled.
    #[serde(default)]
    pub minutes_per_publication: Option<f64>,
}

impl Timing {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(started_at: DateTime<Utc>, finished_at: DateTime<Utc>, processing_minutes: f64, processed: usize) -> Self {
        let elapsed_minutes = (finished_at - started_at).num_milliseconds().max(0) as f64 / 60_000.0;
        let minutes_per_publication =
            (processed > 0 && processing_minutes > 0.0).then(|| processing_minutes / processed as f64);
        Self {
            started_at,
            finished_at,
            elapsed_minutes,
            processing_minutes,
            minutes_per_publication,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub counts: RunCounts,
    pub funnel: Funnel,
    pub screening: ScreeningStats,
    pub budget: BudgetSummary,
    pub by_verdict: BTreeMap<String, usize>,
    pub by_publication_type: BTreeMap<String, usize>,
    pub by_tool_type: BTreeMap<ToolType, ToolTypeCounts>,
    pub observations: usize,
    pub patterns: PatternSummary,
    /// Tool types with no patterns, and other degraded inputs.
    pub coverage_gaps: Vec<String>,
    pub timing: Timing,
}

/// Time per publication measured by the previous run in `output_dir`.
#[must_use]
pub fn measured_rate(output_dir: &Path) -> Option<f64> {
    let summary: RunSummary = crate::persist::read_json(&output_dir.join(SUMMARY_FILE))?;
    summary
        .timing
        .minutes_per_publication
        .filter(|rate| *rate > 0.0 && rate.is_finite())
}

fn table_row(out: &mut String, cells: &[String]) {
    let _ = writeln!(out, "| {} |", cells.join(" | "));
}

/// Human-readable run report.
#[must_use]
pub fn render_report(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Validation report\n");
    let _ = writeln!(
        out,
        "Run finished {} after {:.1} minutes.\n",
        summary.timing.finished_at.format("%Y-%m-%d %H:%M UTC"),
        summary.timing.elapsed_minutes
    );

    let c = summary.counts;
    let _ = writeln!(out, "## Publications\n");
    let _ = writeln!(out, "| Processed | Reused | Deferred | Failed |");
    let _ = writeln!(out, "|---|---|---|---|");
    let _ = writeln!(out, "| {} | {} | {} | {} |\n", c.processed, c.skipped_cached, c.deferred, c.failed);

    let f = summary.funnel;
    let s = summary.screening;
    let _ = writeln!(out, "- indexed: {}", f.indexed);
    let _ = writeln!(
        out,
        "- screened out: {} by title, {} by abstract ({} screening failures)",
        s.title_excluded, s.abstract_excluded, s.failed
    );
    let _ = writeln!(out, "- passed screening: {}", f.passed_screening);
    let _ = writeln!(out, "- within budget: {}", f.budgeted);
    let _ = writeln!(
        out,
        "- with candidates: {}, without: {}, mined without full text: {}\n",
        f.with_candidates, f.without_candidates, f.text_unavailable
    );

    if summary.budget.deferred > 0 {
        let _ = writeln!(
            out,
            "{} publications were deferred: the budget allowed {} at {:.2} minutes each.\n",
            summary.budget.deferred, summary.budget.max_publications, summary.budget.minutes_per_publication
        );
    }

    let _ = writeln!(out, "## Verdicts\n");
    let _ = writeln!(out, "| Verdict | Count |");
    let _ = writeln!(out, "|---|---|");
    for (verdict, count) in &summary.by_verdict {
        table_row(&mut out, &[verdict.clone(), count.to_string()]);
    }
    out.push('\n');

    if !summary.by_publication_type.is_empty() {
        let _ = writeln!(out, "| Publication type | Count |");
        let _ = writeln!(out, "|---|---|");
        for (kind, count) in &summary.by_publication_type {
            table_row(&mut out, &[kind.clone(), count.to_string()]);
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## Tools by type\n");
    let _ = writeln!(out, "| Type | Candidates | Accepted | Validated | Filtered |");
    let _ = writeln!(out, "|---|---|---|---|---|");
    for (tool_type, counts) in &summary.by_tool_type {
        table_row(
            &mut out,
            &[
                tool_type.display_name().to_string(),
                counts.candidates.to_string(),
                counts.accepted.to_string(),
                counts.validated.to_string(),
                counts.filtered.to_string(),
            ],
        );
    }
    let _ = writeln!(out, "\nObservations extracted: {}\n", summary.observations);

    let p = summary.patterns;
    let _ = writeln!(out, "## Patterns\n");
    let _ = writeln!(
        out,
        "Version {} -> {}: {} merged, {} for review, {} discarded, {} duplicates.\n",
        p.previous_version, p.version, p.merged, p.review, p.discarded, p.duplicates
    );

    if !summary.coverage_gaps.is_empty() {
        let _ = writeln!(out, "## Coverage gaps\n");
        for gap in &summary.coverage_gaps {
            let _ = writeln!(out, "- {gap}");
        }
    }
    out
}
