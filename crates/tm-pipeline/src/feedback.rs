//! Pattern feedback loop.
//!
//! Suggestions gathered from this run's reviews are sorted by confidence:
//!
//! ```text
//! (auto_pattern, 1.0]          merged into the next pattern-set version
//! [review_pattern, auto_pattern]   listed in pattern_review.md
//! [0, review_pattern)          discarded (counted)
//! ```
//!
//! Regexes that do not compile are never merged; they go to review. The
//! in-run pattern set is never touched: [`PatternFeedback::apply`] returns
//! the next version, written by the caller at the end of the run.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tm_config::ThresholdsConfig;
use tm_core::ToolType;
use tm_core::documents::{PatternKind, PatternSuggestion, VerdictDocument, clamp_confidence};
use tm_extract::{MergeOutcome, PatternProvenance, PatternSet};

/// File name of the human review report in the output directory.
pub const REVIEW_FILE: &str = "pattern_review.md";

/// A suggestion with the publication it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourcedSuggestion {
    pub pmid: String,
    pub suggestion: PatternSuggestion,
}

/// A suggestion waiting for a curator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewItem {
    pub tool_type: ToolType,
    pub kind: PatternKind,
    pub pattern: String,
    pub canonical_name: Option<String>,
    pub confidence: f64,
    pub pmids: BTreeSet<String>,
    pub rationale: String,
    /// Why it was not merged automatically, when not just its confidence.
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedbackReport {
    pub previous_version: u32,
    pub version: u32,
    pub merged: Vec<SourcedSuggestion>,
    pub review: Vec<ReviewItem>,
    pub discarded: usize,
    pub duplicates: usize,
    pub invalid_regex: usize,
}

impl FeedbackReport {
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.merged.is_empty()
    }
}

/// Pattern suggestions of `documents`, plus missed tools the reviewer says
/// should be added (as literal suggestions).
#[must_use]
pub fn collect_suggestions<'a, I>(documents: I) -> Vec<SourcedSuggestion>
where
    I: IntoIterator<Item = &'a VerdictDocument>,
{
    let mut out = Vec::new();
    for document in documents {
        out.extend(document.pattern_suggestions.iter().map(|suggestion| SourcedSuggestion {
            pmid: document.pmid.clone(),
            suggestion: suggestion.clone(),
        }));
        out.extend(
            document
                .missed_tools
                .iter()
                .filter(|missed| missed.should_be_added && !missed.tool_name.trim().is_empty())
                .map(|missed| SourcedSuggestion {
                    pmid: document.pmid.clone(),
                    suggestion: PatternSuggestion {
                        tool_type: missed.tool_type,
                        pattern: missed.tool_name.trim().to_string(),
                        kind: PatternKind::Literal,
                        confidence: missed.confidence,
                        rationale: format!("missed by extractor ({})", missed.location),
                        canonical_name: None,
                    },
                }),
        );
    }
    out
}

#[derive(Debug, Clone, Copy)]
pub struct PatternFeedback {
    auto_pattern: f64,
    review_pattern: f64,
}

impl PatternFeedback {
    #[must_use]
    pub const fn new(auto_pattern: f64, review_pattern: f64) -> Self {
        Self {
            auto_pattern,
            review_pattern,
        }
    }

    #[must_use]
    pub const fn from_thresholds(thresholds: &ThresholdsConfig) -> Self {
        Self::new(thresholds.auto_pattern, thresholds.review_pattern)
    }

    /// Next pattern-set version and what happened to each suggestion.
    #[must_use]
    pub fn apply(&self, current: &PatternSet, suggestions: &[SourcedSuggestion], now: DateTime<Utc>) -> (PatternSet, FeedbackReport) {
        let mut next = current.clone();
        let version = current.version + 1;
        let mut report = FeedbackReport {
            previous_version: current.version,
            version: current.version,
            ..FeedbackReport::default()
        };

        for sourced in suggestions {
            let suggestion = &sourced.suggestion;
            let pattern = suggestion.pattern.trim();
            let confidence = clamp_confidence(suggestion.confidence);
            if pattern.is_empty() || confidence < self.review_pattern {
                report.discarded += 1;
                continue;
            }
            if next.contains(suggestion.tool_type, pattern, suggestion.kind) {
                report.duplicates += 1;
                continue;
            }

            let invalid = match suggestion.kind {
                PatternKind::Regex => regex::Regex::new(pattern).err().map(|e| format!("invalid regex: {e}")),
                PatternKind::Literal => None,
            };
            if invalid.is_some() {
                report.invalid_regex += 1;
            }

            if confidence > self.auto_pattern && invalid.is_none() {
                let provenance = PatternProvenance {
                    tool_type: suggestion.tool_type,
                    pattern: pattern.to_string(),
                    kind: suggestion.kind,
                    pmid: sourced.pmid.clone(),
                    rationale: suggestion.rationale.clone(),
                    confidence,
                    version,
                    added_at: now,
                };
                match next.merge(
                    suggestion.tool_type,
                    pattern,
                    suggestion.kind,
                    suggestion.canonical_name.as_deref(),
                    provenance,
                ) {
                    Ok(MergeOutcome::Added) => {
                        tracing::info!(tool_type = %suggestion.tool_type, pattern, pmid = %sourced.pmid, "pattern merged");
                        report.merged.push(sourced.clone());
                    }
                    Ok(MergeOutcome::Duplicate) => report.duplicates += 1,
                    Err(error) => {
                        tracing::warn!(pattern, %error, "pattern rejected at merge");
                        push_review(&mut report, sourced, confidence, Some(error.to_string()));
                    }
                }
            } else {
                push_review(&mut report, sourced, confidence, invalid);
            }
        }

        if report.changed() {
            next.version = version;
            next.updated_at = Some(now);
            report.version = version;
        }
        tracing::info!(
            merged = report.merged.len(),
            review = report.review.len(),
            discarded = report.discarded,
            duplicates = report.duplicates,
            version = report.version,
            "pattern feedback applied"
        );
        (next, report)
    }
}

/// Add to the review list, folding repeats of the same pattern together.
fn push_review(report: &mut FeedbackReport, sourced: &SourcedSuggestion, confidence: f64, note: Option<String>) {
    let suggestion = &sourced.suggestion;
    let pattern = suggestion.pattern.trim();
    if let Some(item) = report.review.iter_mut().find(|item| {
        item.tool_type == suggestion.tool_type && item.kind == suggestion.kind && item.pattern.eq_ignore_ascii_case(pattern)
    }) {
        item.pmids.insert(sourced.pmid.clone());
        item.confidence = item.confidence.max(confidence);
        return;
    }
    report.review.push(ReviewItem {
        tool_type: suggestion.tool_type,
        kind: suggestion.kind,
        pattern: pattern.to_string(),
        canonical_name: suggestion.canonical_name.clone(),
        confidence,
        pmids: BTreeSet::from([sourced.pmid.clone()]),
        rationale: suggestion.rationale.clone(),
        note,
    });
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Markdown table of suggestions awaiting review.
#[must_use]
pub fn render_review(report: &FeedbackReport, feedback: &PatternFeedback) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Pattern suggestions for review\n");
    let _ = writeln!(
        out,
        "Pattern set version {}. Suggestions with confidence between {:.2} and {:.2}, and regexes that do not compile, need a curator before they are added.\n",
        report.version, feedback.review_pattern, feedback.auto_pattern
    );
    if report.review.is_empty() {
        let _ = writeln!(out, "Nothing to review.");
        return out;
    }
    let _ = writeln!(out, "| Tool type | Kind | Pattern | Canonical | Confidence | PMIDs | Rationale | Note |");
    let _ = writeln!(out, "|---|---|---|---|---|---|---|---|");
    for item in &report.review {
        let kind = match item.kind {
            PatternKind::Literal => "literal",
            PatternKind::Regex => "regex",
        };
        let pmids: Vec<&str> = item.pmids.iter().map(String::as_str).collect();
        let _ = writeln!(
            out,
            "| {} | {} | `{}` | {} | {:.2} | {} | {} | {} |",
            item.tool_type.display_name(),
            kind,
            cell(&item.pattern),
            cell(item.canonical_name.as_deref().unwrap_or("")),
            item.confidence,
            pmids.join(", "),
            cell(&item.rationale),
            cell(item.note.as_deref().unwrap_or("")),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sourced(pattern: &str, kind: PatternKind, confidence: f64) -> SourcedSuggestion {
        SourcedSuggestion {
            pmid: "7".into(),
            suggestion: PatternSuggestion {
                tool_type: ToolType::ComputationalTool,
                pattern: pattern.into(),
                kind,
                confidence,
                rationale: "seen in methods".into(),
                canonical_name: None,
            },
        }
    }

    fn feedback() -> PatternFeedback {
        PatternFeedback::from_thresholds(&ThresholdsConfig::default())
    }

    #[test]
    fn confidence_bands_route_suggestions() {
        let current = PatternSet::builtin();
        let suggestions = [
            sourced("NFQuant", PatternKind::Literal, 0.95),
            sourced("TumorTrack", PatternKind::Literal, 0.8),
            sourced("SegNF", PatternKind::Literal, 0.9),
            sourced("maybe-tool", PatternKind::Literal, 0.5),
        ];
        let (next, report) = feedback().apply(&current, &suggestions, Utc::now());

        assert_eq!(report.merged.len(), 1);
        assert_eq!(report.review.len(), 2);
        assert_eq!(report.discarded, 1);
        assert_eq!(next.version, current.version + 1);
        assert!(next.contains(ToolType::ComputationalTool, "NFQuant", PatternKind::Literal));
        assert!(!current.contains(ToolType::ComputationalTool, "NFQuant", PatternKind::Literal));
        assert_eq!(next.provenance.last().unwrap().pmid, "7");
    }

    #[test]
    fn invalid_regex_goes_to_review_even_when_confident() {
        let (next, report) = feedback().apply(
            &PatternSet::builtin(),
            &[sourced(r"sNF\d+(", PatternKind::Regex, 0.99)],
            Utc::now(),
        );
        assert!(report.merged.is_empty());
        assert_eq!(report.invalid_regex, 1);
        assert!(report.review[0].note.as_deref().unwrap().starts_with("invalid regex"));
        assert_eq!(next.version, PatternSet::builtin().version);
    }

    #[test]
    fn duplicates_are_not_merged_twice() {
        let suggestions = [
            sourced("NFQuant", PatternKind::Literal, 0.95),
            sourced("nfquant", PatternKind::Literal, 0.97),
        ];
        let (_, report) = feedback().apply(&PatternSet::builtin(), &suggestions, Utc::now());
        assert_eq!(report.merged.len(), 1);
        assert_eq!(report.duplicates, 1);
    }

    #[test]
    fn review_report_escapes_pipes() {
        let (_, report) = feedback().apply(
            &PatternSet::builtin(),
            &[sourced(r"sNF(94|96)\.\d", PatternKind::Regex, 0.8)],
            Utc::now(),
        );
        let markdown = render_review(&report, &feedback());
        assert!(markdown.contains(r"`sNF(94\|96)\.\d`"));
        assert!(markdown.contains("| Computational Tool | regex |"));
    }
}
