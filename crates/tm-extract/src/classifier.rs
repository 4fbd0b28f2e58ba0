//! Development-versus-usage classification of candidates.
//!
//! Rules:
//!
//! 1. a version number or vendor/catalog phrase within 60 characters of any
//!    mention means the tool was acquired or run, so usage;
//! 2. a first-person development phrase within 200 characters of a mention,
//!    without a usage phrase in the 40 characters before that mention,
//!    means development;
//! 3. a tool on the type's established list is usage, overriding rule 2;
//! 4. otherwise usage.
//!
//! Because rule 3 overrides rule 2, it is checked before the development
//! phrases are searched.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tm_core::ToolType;
use tm_core::tools::ToolCandidate;

use crate::context::{KNOWN_VENDORS, version_after, window};
use crate::patterns::PatternSet;

const ACQUISITION_RADIUS: usize = 60;
const DEVELOPMENT_RADIUS: usize = 200;
const USAGE_LOOKBEHIND: usize = 40;

static VERSION_NEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:v\.?\s?|version\s+|ver\.\s?)\d+(?:\.\d+)*[a-z0-9]*\b")
        .expect("version regex must compile")
});

static ACQUISITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:purchased|obtained|acquired|bought|ordered)\s+from\b|\bcat(?:alog(?:ue)?)?\.?\s*(?:no\.?|number|#)|\bRRID:",
    )
    .expect("acquisition regex must compile")
});

static DEVELOPMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bwe\s+(?:have\s+)?(?:also\s+|newly\s+|further\s+)?(?:developed|created|designed|established|generated|engineered)\b",
    )
    .expect("development regex must compile")
});

static USAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:using|used|utili[sz]ing|analy[sz]ed\s+(?:with|using|by|in)|purchased\s+from|obtained\s+from|measured\s+(?:with|by|using)|processed\s+(?:with|in|using)|quantified\s+(?:with|in|using)|assessed\s+(?:with|by|using)|performed\s+(?:with|in|using))\b",
    )
    .expect("usage regex must compile")
});

/// Which rule decided a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierRule {
    VersionOrVendor,
    Established,
    DevelopmentPhrase,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub is_development: bool,
    pub is_established: bool,
    pub rule: ClassifierRule,
}

pub struct ContextClassifier {
    established: HashMap<ToolType, HashSet<String>>,
}

impl ContextClassifier {
    #[must_use]
    pub fn new(patterns: &PatternSet) -> Self {
        let established = patterns
            .types
            .iter()
            .map(|(tool_type, set)| {
                let names = set.established.iter().map(|n| n.trim().to_lowercase()).collect();
                (*tool_type, names)
            })
            .collect();
        Self { established }
    }

    /// Whether the candidate is on its type's established list.
    #[must_use]
    pub fn is_established(&self, candidate: &ToolCandidate) -> bool {
        self.established.get(&candidate.tool_type).is_some_and(|names| {
            names.contains(&candidate.name.to_lowercase())
                || names.contains(&candidate.matched_text.to_lowercase())
        })
    }

    /// `true` when the publication develops the tool rather than using it.
    #[must_use]
    pub fn classify(&self, candidate: &ToolCandidate, full_text: &str) -> bool {
        self.classify_detailed(candidate, full_text).is_development
    }

    #[must_use]
    pub fn classify_detailed(&self, candidate: &ToolCandidate, full_text: &str) -> Classification {
        let is_established = self.is_established(candidate);
        let mentions = mentions(full_text, candidate);

        let usage = |rule| Classification {
            is_development: false,
            is_established,
            rule,
        };

        if mentions
            .iter()
            .any(|&(start, end)| has_acquisition_evidence(full_text, start, end))
        {
            return usage(ClassifierRule::VersionOrVendor);
        }
        if is_established {
            return usage(ClassifierRule::Established);
        }
        if mentions
            .iter()
            .any(|&(start, end)| has_development_evidence(full_text, start, end))
        {
            return Classification {
                is_development: true,
                is_established,
                rule: ClassifierRule::DevelopmentPhrase,
            };
        }
        usage(ClassifierRule::Default)
    }

    /// Set the development and established flags on every candidate.
    pub fn apply(&self, candidates: &mut [ToolCandidate], full_text: &str) {
        for candidate in candidates.iter_mut() {
            let result = self.classify_detailed(candidate, full_text);
            candidate.is_development = result.is_development;
            candidate.is_established = result.is_established;
            if result.is_development {
                tracing::debug!(tool = %candidate.name, tool_type = %candidate.tool_type, "classified as development");
            }
        }
    }
}

/// Byte ranges of every case-insensitive occurrence of the candidate's
/// name or matched text.
fn mentions(text: &str, candidate: &ToolCandidate) -> Vec<(usize, usize)> {
    let haystack = text.to_ascii_lowercase();
    let mut found = Vec::new();
    let mut needles = vec![candidate.matched_text.to_ascii_lowercase()];
    let name = candidate.name.to_ascii_lowercase();
    if !needles.contains(&name) {
        needles.push(name);
    }
    for needle in needles.iter().filter(|n| !n.trim().is_empty()) {
        let mut from = 0;
        while let Some(pos) = haystack[from..].find(needle.as_str()) {
            let start = from + pos;
            let end = start + needle.len();
            found.push((start, end));
            from = end;
        }
    }
    found.sort_unstable();
    found.dedup();
    found
}

fn has_acquisition_evidence(text: &str, start: usize, end: usize) -> bool {
    if version_after(text, end).is_some() {
        return true;
    }
    let (from, to) = window(text, start, end, ACQUISITION_RADIUS);
    let near = &text[from..to];
    VERSION_NEAR.is_match(near)
        || ACQUISITION.is_match(near)
        || KNOWN_VENDORS.iter().any(|vendor| near.contains(vendor))
}

fn has_development_evidence(text: &str, start: usize, end: usize) -> bool {
    let (from, to) = window(text, start, end, DEVELOPMENT_RADIUS);
    if !DEVELOPMENT.is_match(&text[from..to]) {
        return false;
    }
    let (before, _) = window(text, start, start, USAGE_LOOKBEHIND);
    !USAGE.is_match(&text[before..start])
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use tm_core::{MatchKind, Section};

    fn candidate(name: &str, tool_type: ToolType) -> ToolCandidate {
        ToolCandidate {
            name: name.to_string(),
            matched_text: name.to_string(),
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

    fn classifier() -> ContextClassifier {
        ContextClassifier::new(&PatternSet::builtin())
    }

    #[test]
    fn version_number_means_usage() {
        let text = "Data were analyzed using ImageJ (v1.53k).";
        let result = classifier().classify_detailed(&candidate("ImageJ", ToolType::ComputationalTool), text);
        assert!(!result.is_development);
        assert_eq!(result.rule, ClassifierRule::VersionOrVendor);
        assert!(result.is_established);
    }

    #[test]
    fn development_phrase_marks_new_tool() {
        let text = "Here we developed NFQuant, an open-source pipeline for tumor volumetrics.";
        let c = candidate("NFQuant", ToolType::ComputationalTool);
        let result = classifier().classify_detailed(&c, text);
        assert!(result.is_development);
        assert_eq!(result.rule, ClassifierRule::DevelopmentPhrase);
    }

    #[test]
    fn established_tool_overrides_development_phrase() {
        let text = "We developed a macro for ImageJ to segment neurofibromas.";
        let result = classifier().classify_detailed(&candidate("ImageJ", ToolType::ComputationalTool), text);
        assert!(!result.is_development);
        assert_eq!(result.rule, ClassifierRule::Established);
    }

    #[test]
    fn usage_phrase_before_mention_blocks_development() {
        let text = "We developed a new staining protocol. Slides were then analyzed using TumorSeg.";
        let c = candidate("TumorSeg", ToolType::ComputationalTool);
        assert!(!classifier().classify(&c, text));
    }

    #[test]
    fn vendor_near_mention_means_usage() {
        let text = "We generated lysates and probed with anti-neurofibromin (Santa Cruz Biotechnology).";
        let c = candidate("anti-neurofibromin", ToolType::Antibody);
        let result = classifier().classify_detailed(&c, text);
        assert_eq!(result.rule, ClassifierRule::VersionOrVendor);
    }

    #[test]
    fn apply_sets_flags() {
        let text = "We engineered the sNF-X line for this study.";
        let mut candidates = vec![candidate("sNF-X", ToolType::CellLine)];
        classifier().apply(&mut candidates, text);
        assert!(candidates[0].is_development);
        assert!(!candidates[0].is_established);
    }
}
