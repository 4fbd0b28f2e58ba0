//! Candidate extraction over publication text.
//!
//! Per tool type, in order: literal names and synonyms, fuzzy near-matches
//! of names not already found literally, alias rules, and regex templates.
//! Every match is canonicalized to its preferred name and the result is
//! deduplicated to one candidate per (name, type).

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use regex::{Regex, RegexBuilder};
use tm_core::publication::Publication;
use tm_core::tools::ToolCandidate;
use tm_core::{MatchKind, Section, ToolType};

use crate::context::{read_metadata, snippet};
use crate::error::ExtractError;
use crate::fuzzy::FuzzyMatcher;
use crate::patterns::PatternSet;

/// Names at or below this length only match with exact case.
pub const CASE_SENSITIVE_MAX_LEN: usize = 4;

pub const EXACT_CASE_CONFIDENCE: f64 = 0.95;
pub const FOLDED_CASE_CONFIDENCE: f64 = 0.85;
pub const SYNONYM_CONFIDENCE: f64 = 0.90;
pub const FUZZY_CONFIDENCE_SCALE: f64 = 0.85;

/// Candidates found in one publication plus the tool types that could not
/// be searched at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionReport {
    pub candidates: Vec<ToolCandidate>,
    pub coverage_gaps: Vec<ToolType>,
}

#[derive(Debug, Clone)]
struct LiteralEntry {
    surface: String,
    canonical: String,
    kind: MatchKind,
}

struct Rewrite {
    regex: Regex,
    canonical: Option<String>,
    confidence: f64,
    kind: MatchKind,
}

struct TypeMatcher {
    tool_type: ToolType,
    folded: Option<Regex>,
    exact: Option<Regex>,
    folded_lookup: HashMap<String, LiteralEntry>,
    exact_lookup: HashMap<String, LiteralEntry>,
    fuzzy_names: Vec<(String, String)>,
    rewrites: Vec<Rewrite>,
    /// Lowercased known name or synonym to its preferred spelling. Keys that
    /// fold onto two different preferred names are left out.
    preferred: HashMap<String, String>,
}

/// Compiled, immutable view of a pattern set.
pub struct Extractor {
    matchers: Vec<TypeMatcher>,
    coverage_gaps: Vec<ToolType>,
    fuzzy_threshold: f64,
}

impl Extractor {
    /// Compile `patterns`. Regex templates or aliases that fail to compile
    /// are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::EmptyPatternSet`] when no type has a pattern,
    /// or [`ExtractError::InvalidPattern`] if a literal alternation exceeds
    /// the regex size limit.
    pub fn new(patterns: &PatternSet, fuzzy_threshold: f64) -> Result<Self, ExtractError> {
        patterns.ensure_usable()?;
        let coverage_gaps = patterns.coverage_gaps();
        for gap in &coverage_gaps {
            tracing::warn!(tool_type = %gap, "no patterns for tool type; it cannot yield candidates");
        }

        let mut matchers = Vec::new();
        for tool_type in ToolType::ALL {
            if coverage_gaps.contains(&tool_type) {
                continue;
            }
            matchers.push(TypeMatcher::compile(patterns, tool_type)?);
        }

        Ok(Self {
            matchers,
            coverage_gaps,
            fuzzy_threshold,
        })
    }

    #[must_use]
    pub fn coverage_gaps(&self) -> &[ToolType] {
        &self.coverage_gaps
    }

    /// Extract from every available section of `publication`.
    #[must_use]
    pub fn extract(&self, publication: &Publication) -> ExtractionReport {
        self.extract_sections(&publication.mining_text())
    }

    /// Extract from explicit `(section, text)` pairs.
    #[must_use]
    pub fn extract_sections(&self, sections: &[(Section, &str)]) -> ExtractionReport {
        let mut candidates = Vec::new();

        for matcher in &self.matchers {
            let mut literal_hits: HashSet<String> = HashSet::new();
            for (section, text) in sections {
                matcher.scan_literals(*section, text, &mut candidates, &mut literal_hits);
                matcher.scan_rewrites(*section, text, &mut candidates);
            }

            if matcher.fuzzy_names.is_empty() {
                continue;
            }
            let mut fuzzy = FuzzyMatcher::new(
                matcher
                    .fuzzy_names
                    .iter()
                    .filter(|(_, canonical)| !literal_hits.contains(&canonical.to_lowercase()))
                    .map(|(name, canonical)| (name.as_str(), canonical.as_str())),
                self.fuzzy_threshold,
            );
            if fuzzy.is_empty() {
                continue;
            }
            for (section, text) in sections {
                for hit in fuzzy.find(text) {
                    candidates.push(build_candidate(
                        matcher.tool_type,
                        *section,
                        text,
                        (hit.start, hit.end),
                        hit.canonical,
                        MatchKind::Fuzzy,
                        FUZZY_CONFIDENCE_SCALE * hit.similarity,
                    ));
                }
            }
        }

        ExtractionReport {
            candidates: dedup(candidates),
            coverage_gaps: self.coverage_gaps.clone(),
        }
    }
}

impl TypeMatcher {
    fn compile(patterns: &PatternSet, tool_type: ToolType) -> Result<Self, ExtractError> {
        let set = patterns.for_type(tool_type);

        let mut folded_lookup = HashMap::new();
        let mut exact_lookup = HashMap::new();
        let mut fuzzy_names = Vec::new();
        let mut preferred = HashMap::new();
        let mut ambiguous = HashSet::new();

        let literals = set
            .known_names
            .iter()
            .map(|name| (name.clone(), name.clone(), MatchKind::Literal))
            .chain(
                set.synonyms
                    .iter()
                    .map(|(synonym, target)| (synonym.clone(), target.clone(), MatchKind::Synonym)),
            );
        for (surface, canonical, kind) in literals {
            let surface = surface.trim().to_string();
            if surface.is_empty() {
                continue;
            }
            fuzzy_names.push((surface.clone(), canonical.clone()));
            for key in [surface.to_lowercase(), canonical.trim().to_lowercase()] {
                match preferred.get(&key) {
                    Some(existing) if existing != &canonical => {
                        ambiguous.insert(key);
                    }
                    Some(_) => {}
                    None => {
                        preferred.insert(key, canonical.clone());
                    }
                }
            }
            let entry = LiteralEntry {
                surface: surface.clone(),
                canonical,
                kind,
            };
            if surface.chars().count() <= CASE_SENSITIVE_MAX_LEN {
                exact_lookup.entry(surface).or_insert(entry);
            } else {
                folded_lookup.entry(surface.to_lowercase()).or_insert(entry);
            }
        }

        for key in &ambiguous {
            preferred.remove(key);
        }

        let folded = alternation(folded_lookup.values().map(|e| e.surface.as_str()), true, tool_type)?;
        let exact = alternation(exact_lookup.keys().map(String::as_str), false, tool_type)?;

        let mut rewrites = Vec::new();
        for alias in &set.aliases {
            match Regex::new(&alias.pattern) {
                Ok(regex) => rewrites.push(Rewrite {
                    regex,
                    canonical: Some(alias.canonical.clone()),
                    confidence: alias.confidence,
                    kind: MatchKind::Alias,
                }),
                Err(error) => {
                    tracing::warn!(%tool_type, pattern = %alias.pattern, %error, "skipping alias that does not compile");
                }
            }
        }
        for template in &set.regex_patterns {
            match Regex::new(&template.pattern) {
                Ok(regex) => rewrites.push(Rewrite {
                    regex,
                    canonical: template.canonical.clone(),
                    confidence: template.confidence,
                    kind: MatchKind::Pattern,
                }),
                Err(error) => {
                    tracing::warn!(%tool_type, pattern = %template.pattern, %error, "skipping regex template that does not compile");
                }
            }
        }

        Ok(Self {
            tool_type,
            folded,
            exact,
            folded_lookup,
            exact_lookup,
            fuzzy_names,
            rewrites,
            preferred,
        })
    }

    /// The preferred spelling of a rewritten name, when it is a known name
    /// or synonym in any casing.
    fn canonical_spelling(&self, name: String) -> String {
        self.preferred.get(&name.to_lowercase()).cloned().unwrap_or(name)
    }

    fn scan_literals(
        &self,
        section: Section,
        text: &str,
        out: &mut Vec<ToolCandidate>,
        hits: &mut HashSet<String>,
    ) {
        let passes = [
            (self.folded.as_ref(), &self.folded_lookup, true),
            (self.exact.as_ref(), &self.exact_lookup, false),
        ];
        for (regex, lookup, fold) in passes {
            let Some(regex) = regex else { continue };
            for m in regex.find_iter(text) {
                if !at_word_boundary(text, m.start(), m.end()) {
                    continue;
                }
                let key = if fold {
                    m.as_str().to_lowercase()
                } else {
                    m.as_str().to_string()
                };
                let Some(entry) = lookup.get(&key) else { continue };
                let confidence = match entry.kind {
                    MatchKind::Synonym => SYNONYM_CONFIDENCE,
                    _ if m.as_str() == entry.surface => EXACT_CASE_CONFIDENCE,
                    _ => FOLDED_CASE_CONFIDENCE,
                };
                hits.insert(entry.canonical.to_lowercase());
                out.push(build_candidate(
                    self.tool_type,
                    section,
                    text,
                    (m.start(), m.end()),
                    entry.canonical.clone(),
                    entry.kind,
                    confidence,
                ));
            }
        }
    }

    fn scan_rewrites(&self, section: Section, text: &str, out: &mut Vec<ToolCandidate>) {
        for rewrite in &self.rewrites {
            for caps in rewrite.regex.captures_iter(text) {
                let Some(whole) = caps.get(0) else { continue };
                let name = match &rewrite.canonical {
                    Some(template) => {
                        let mut expanded = String::new();
                        caps.expand(template, &mut expanded);
                        expanded
                    }
                    None => whole.as_str().to_string(),
                };
                let name = name.trim().to_string();
                if name.is_empty() {
                    continue;
                }
                let name = self.canonical_spelling(name);
                out.push(build_candidate(
                    self.tool_type,
                    section,
                    text,
                    (whole.start(), whole.end()),
                    name,
                    rewrite.kind,
                    rewrite.confidence,
                ));
            }
        }
    }
}

/// Case-(in)sensitive alternation of escaped names, longest first so the
/// leftmost-first engine prefers `GraphPad Prism` over `Prism`.
fn alternation<'a>(
    names: impl Iterator<Item = &'a str>,
    fold: bool,
    tool_type: ToolType,
) -> Result<Option<Regex>, ExtractError> {
    let mut names: Vec<&str> = names.collect();
    if names.is_empty() {
        return Ok(None);
    }
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let pattern = names
        .iter()
        .map(|n| regex::escape(n))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(fold)
        .build()
        .map(Some)
        .map_err(|source| ExtractError::InvalidPattern {
            tool_type,
            pattern: format!("<{} literal names>", names.len()),
            source,
        })
}

/// Neither neighbor of `start..end` is alphanumeric.
fn at_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

fn build_candidate(
    tool_type: ToolType,
    section: Section,
    text: &str,
    (start, end): (usize, usize),
    name: String,
    match_kind: MatchKind,
    confidence: f64,
) -> ToolCandidate {
    ToolCandidate {
        name,
        matched_text: text[start..end].to_string(),
        tool_type,
        section,
        context: snippet(text, start, end),
        confidence: confidence.clamp(0.0, 1.0),
        match_kind,
        is_development: false,
        is_established: false,
        metadata: read_metadata(text, start, end, tool_type),
    }
}

/// One candidate per (canonical name, type).
///
/// The winner has the highest confidence, then the most metadata, then the
/// strongest section; metadata it lacks is filled from the others.
#[must_use]
pub fn dedup(candidates: Vec<ToolCandidate>) -> Vec<ToolCandidate> {
    let mut groups: BTreeMap<(ToolType, String), Vec<ToolCandidate>> = BTreeMap::new();
    for candidate in candidates {
        let (name, tool_type) = candidate.dedup_key();
        groups.entry((tool_type, name)).or_default().push(candidate);
    }

    groups
        .into_values()
        .filter_map(|mut group| {
            group.sort_by(rank);
            let mut iter = group.into_iter();
            let mut winner = iter.next()?;
            for loser in iter {
                for (key, value) in loser.metadata {
                    winner.metadata.entry(key).or_insert(value);
                }
            }
            Some(winner)
        })
        .collect()
}

fn rank(a: &ToolCandidate, b: &ToolCandidate) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| b.metadata.len().cmp(&a.metadata.len()))
        .then_with(|| a.section.provenance_rank().cmp(&b.section.provenance_rank()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extractor() -> Extractor {
        Extractor::new(&PatternSet::builtin(), 0.83).unwrap()
    }

    fn find<'a>(report: &'a ExtractionReport, name: &str) -> Option<&'a ToolCandidate> {
        report.candidates.iter().find(|c| c.name == name)
    }

    #[test]
    fn exact_and_folded_case_confidence() {
        let report = extractor().extract_sections(&[(Section::Methods, "Images were processed in ImageJ and imagej macros.")]);
        let imagej = find(&report, "ImageJ").unwrap();
        assert!((imagej.confidence - EXACT_CASE_CONFIDENCE).abs() < f64::EPSILON);
        assert_eq!(report.candidates.iter().filter(|c| c.name == "ImageJ").count(), 1);
    }

    #[test]
    fn short_names_require_exact_case() {
        let report = extractor().extract_sections(&[(Section::Methods, "Analyses used spss and SPSS.")]);
        let spss = find(&report, "SPSS").unwrap();
        assert_eq!(spss.matched_text, "SPSS");

        let lower_only = extractor().extract_sections(&[(Section::Methods, "Analyses used spss.")]);
        assert!(find(&lower_only, "SPSS").is_none());
    }

    #[test]
    fn synonym_is_canonicalized() {
        let report = extractor().extract_sections(&[(Section::Methods, "Statistics were computed in Prism 9.")]);
        let prism = find(&report, "GraphPad Prism").unwrap();
        assert_eq!(prism.match_kind, MatchKind::Synonym);
        assert_eq!(prism.matched_text, "Prism");
    }

    #[test]
    fn longest_name_wins_at_same_position() {
        let report = extractor().extract_sections(&[(Section::Methods, "GraphPad Prism was used.")]);
        let prism = find(&report, "GraphPad Prism").unwrap();
        assert_eq!(prism.match_kind, MatchKind::Literal);
    }

    #[test]
    fn word_boundaries_are_enforced() {
        let report = extractor().extract_sections(&[(Section::Methods, "The FijiTools package was used.")]);
        assert!(find(&report, "Fiji").is_none());
    }

    #[test]
    fn fuzzy_match_scales_confidence() {
        let report = extractor().extract_sections(&[(Section::Methods, "Nuclei were counted in Cell-Profiler.")]);
        let hit = find(&report, "CellProfiler").unwrap();
        assert_eq!(hit.match_kind, MatchKind::Fuzzy);
        assert!(hit.confidence < FUZZY_CONFIDENCE_SCALE);
        assert!(hit.confidence >= FUZZY_CONFIDENCE_SCALE * 0.83);
    }

    #[test]
    fn rrid_template_expands() {
        let report = extractor().extract_sections(&[(Section::Methods, "We stained with rabbit anti-X (RRID:AB_305808).")]);
        let hit = find(&report, "RRID:AB_305808").unwrap();
        assert_eq!(hit.tool_type, ToolType::Antibody);
        assert_eq!(hit.match_kind, MatchKind::Pattern);
    }

    #[test]
    fn coverage_gap_for_empty_type() {
        let mut set = PatternSet::builtin();
        set.types.remove(&ToolType::Biobank);
        let extractor = Extractor::new(&set, 0.83).unwrap();
        assert_eq!(extractor.coverage_gaps(), &[ToolType::Biobank]);
        let report = extractor.extract_sections(&[(Section::Methods, "Samples came from the UK Biobank.")]);
        assert!(report.candidates.iter().all(|c| c.tool_type != ToolType::Biobank));
        assert_eq!(report.coverage_gaps, vec![ToolType::Biobank]);
    }
}
