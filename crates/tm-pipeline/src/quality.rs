//! Quality filter and completeness scorer.
//!
//! ```text
//! validated  = accept ∧ confidence ≥ validation_accept ∧ domain-specific name
//! filtered   = validated ∧ critical-field fraction ≥ critical_field_min
//! ```
//!
//! Everything else lands in one of the audit lists (rejected, uncertain,
//! below threshold) so nothing is dropped silently.

use std::collections::BTreeMap;

use serde::Serialize;
use tm_config::ThresholdsConfig;
use tm_core::documents::{ValidationVerdict, VerdictDocument};
use tm_core::tools::{ToolCandidate, critical_field_fraction};
use tm_core::{Section, ToolType, Verdict};

use crate::mining::PublicationWork;
use crate::validation::NO_VERDICT_REASON;

/// Maximum completeness score.
pub const COMPLETENESS_SCALE: f64 = 30.0;

/// Names that say what kind of thing a tool is without naming one.
const GENERIC_NAMES: &[&str] = &[
    "antibody",
    "antibodies",
    "primary antibody",
    "secondary antibody",
    "software",
    "program",
    "package",
    "algorithm",
    "pipeline",
    "tool",
    "tools",
    "database",
    "mice",
    "mouse",
    "rat",
    "rats",
    "animal model",
    "animal models",
    "model",
    "models",
    "cells",
    "cell line",
    "cell lines",
    "tumor cells",
    "plasmid",
    "vector",
    "construct",
    "biobank",
    "tissue",
    "samples",
    "questionnaire",
    "survey",
    "scale",
    "organoid",
    "organoids",
    "xenograft",
];

/// Whether `name` identifies a specific tool.
#[must_use]
pub fn is_domain_specific(name: &str) -> bool {
    let name = name.trim();
    if name.chars().count() < 2 {
        return false;
    }
    if name
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_punctuation() || c.is_whitespace())
    {
        return false;
    }
    let folded = name.to_lowercase();
    !GENERIC_NAMES.contains(&folded.as_str())
}

/// Critical-field fraction scaled to `0..=30`, two decimals.
#[must_use]
pub fn completeness_score(fraction: f64) -> f64 {
    (fraction.clamp(0.0, 1.0) * COMPLETENESS_SCALE * 100.0).round() / 100.0
}

/// Extractor metadata overlaid with non-blank reviewer metadata.
#[must_use]
pub fn merge_fields(extracted: &BTreeMap<String, String>, reviewed: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut fields = extracted.clone();
    for (key, value) in reviewed {
        if !value.trim().is_empty() {
            fields.insert(key.clone(), value.trim().to_string());
        }
    }
    fields
}

/// One candidate joined with its verdict and publication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolRecord {
    pub tool_name: String,
    pub tool_type: ToolType,
    pub fields: BTreeMap<String, String>,
    pub pmid: String,
    pub doi: Option<String>,
    pub publication_title: String,
    pub year: Option<i32>,
    pub section: Section,
    pub confidence: f64,
    pub verdict: Verdict,
    pub is_development: bool,
    pub is_established: bool,
    pub critical_fraction: f64,
    pub completeness_score: f64,
    pub context_snippet: String,
    pub reasoning: String,
}

impl ToolRecord {
    #[must_use]
    pub fn new(work: &PublicationWork, candidate: &ToolCandidate, verdict: &ValidationVerdict) -> Self {
        let fields = merge_fields(&candidate.metadata, &verdict.metadata);
        let critical_fraction = critical_field_fraction(candidate.tool_type, &fields);
        Self {
            tool_name: candidate.name.clone(),
            tool_type: candidate.tool_type,
            pmid: work.publication.pmid.clone(),
            doi: work.publication.doi.clone(),
            publication_title: work.publication.title.clone(),
            year: work.publication.year,
            section: candidate.section,
            confidence: verdict.confidence,
            verdict: verdict.verdict,
            is_development: candidate.is_development,
            is_established: candidate.is_established,
            critical_fraction,
            completeness_score: completeness_score(critical_fraction),
            context_snippet: candidate.context.clone(),
            reasoning: verdict.reasoning.clone(),
            fields,
        }
    }
}

/// A record kept out of the output tiers, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub record: ToolRecord,
    pub reason: String,
}

/// Where one record goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// In the validated tier; `filtered` when it also meets the field minimum.
    Validated { filtered: bool },
    Rejected,
    Uncertain,
    BelowThreshold(String),
}

#[derive(Debug, Default)]
pub struct QualityReport {
    pub validated: Vec<ToolRecord>,
    pub filtered: Vec<ToolRecord>,
    pub rejected: Vec<AuditRecord>,
    pub uncertain: Vec<AuditRecord>,
    pub below_threshold: Vec<AuditRecord>,
}

impl QualityReport {
    #[must_use]
    pub fn audited(&self) -> usize {
        self.rejected.len() + self.uncertain.len() + self.below_threshold.len()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QualityFilter {
    validation_accept: f64,
    critical_field_min: f64,
}

impl QualityFilter {
    #[must_use]
    pub const fn new(validation_accept: f64, critical_field_min: f64) -> Self {
        Self {
            validation_accept,
            critical_field_min,
        }
    }

    #[must_use]
    pub const fn from_thresholds(thresholds: &ThresholdsConfig) -> Self {
        Self::new(thresholds.validation_accept, thresholds.critical_field_min)
    }

    #[must_use]
    pub fn disposition(&self, record: &ToolRecord) -> Disposition {
        match record.verdict {
            Verdict::Reject => Disposition::Rejected,
            Verdict::Uncertain => Disposition::Uncertain,
            Verdict::Accept if record.confidence < self.validation_accept => Disposition::BelowThreshold(format!(
                "confidence {:.2} below {:.2}",
                record.confidence, self.validation_accept
            )),
            Verdict::Accept if !is_domain_specific(&record.tool_name) => {
                Disposition::BelowThreshold("generic or non-specific name".to_string())
            }
            Verdict::Accept => Disposition::Validated {
                filtered: record.critical_fraction >= self.critical_field_min,
            },
        }
    }

    /// Sort every candidate of every reviewed publication into tiers.
    pub fn assess<'a, I>(&self, reviewed: I) -> QualityReport
    where
        I: IntoIterator<Item = (&'a PublicationWork, &'a VerdictDocument)>,
    {
        let mut report = QualityReport::default();
        for (work, document) in reviewed {
            for candidate in &work.candidates {
                let fallback;
                let verdict = match document.verdict_for(&candidate.name, candidate.tool_type) {
                    Some(verdict) => verdict,
                    None => {
                        fallback = ValidationVerdict::uncertain(&candidate.name, candidate.tool_type, NO_VERDICT_REASON);
                        &fallback
                    }
                };
                let record = ToolRecord::new(work, candidate, verdict);
                match self.disposition(&record) {
                    Disposition::Validated { filtered } => {
                        if filtered {
                            report.filtered.push(record.clone());
                        }
                        report.validated.push(record);
                    }
                    Disposition::Rejected => report.rejected.push(AuditRecord {
                        reason: "rejected by reviewer".to_string(),
                        record,
                    }),
                    Disposition::Uncertain => report.uncertain.push(AuditRecord {
                        reason: "reviewer uncertain".to_string(),
                        record,
                    }),
                    Disposition::BelowThreshold(reason) => report.below_threshold.push(AuditRecord { record, reason }),
                }
            }
        }
        tracing::info!(
            validated = report.validated.len(),
            filtered = report.filtered.len(),
            rejected = report.rejected.len(),
            uncertain = report.uncertain.len(),
            below_threshold = report.below_threshold.len(),
            "quality filter applied"
        );
        report
    }
}
