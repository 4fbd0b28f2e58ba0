//! Near-match detection of known names in running text.
//!
//! Scoring uses nucleo's fuzzy atom: the known name is the needle and a
//! window of the text is the haystack. The raw score is normalized by the
//! name's score against itself and by the share of the window the name
//! covers, so `Cell-Profiler` scores close to 1 for `CellProfiler` while a
//! long compound like `ImageJ-based` does not.

use nucleo_matcher::pattern::{Atom, AtomKind, CaseMatching, Normalization};
use nucleo_matcher::{Config, Matcher, Utf32Str};

/// Names shorter than this are never fuzzy-matched.
pub const MIN_FUZZY_LEN: usize = 6;

/// A known name prepared for fuzzy matching.
struct Needle {
    canonical: String,
    text: String,
    atom: Atom,
    first: char,
    tokens: usize,
    chars: usize,
    self_score: f64,
}

/// A window of text that matched a needle.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyHit {
    pub canonical: String,
    /// Name the window was compared against (preferred name or synonym).
    pub matched_name: String,
    /// Byte range of the window in the input text.
    pub start: usize,
    pub end: usize,
    pub similarity: f64,
}

pub struct FuzzyMatcher {
    needles: Vec<Needle>,
    matcher: Matcher,
    threshold: f64,
    buf: Vec<char>,
}

impl FuzzyMatcher {
    /// Build from `(name, canonical)` pairs; names shorter than
    /// [`MIN_FUZZY_LEN`] characters are skipped.
    #[must_use]
    pub fn new<'a>(names: impl IntoIterator<Item = (&'a str, &'a str)>, threshold: f64) -> Self {
        let mut matcher = Matcher::new(Config::DEFAULT);
        let mut buf = Vec::new();
        let needles = names
            .into_iter()
            .filter(|(name, _)| name.chars().count() >= MIN_FUZZY_LEN)
            .filter_map(|(name, canonical)| {
                let atom = Atom::new(name, CaseMatching::Ignore, Normalization::Smart, AtomKind::Fuzzy, false);
                let self_score = atom.score(Utf32Str::new(name, &mut buf), &mut matcher)?;
                let first = name.chars().next()?.to_ascii_lowercase();
                Some(Needle {
                    canonical: canonical.to_string(),
                    text: name.to_string(),
                    atom,
                    first,
                    tokens: name.split_whitespace().count(),
                    chars: name.chars().count(),
                    self_score: f64::from(self_score),
                })
            })
            .collect();
        Self {
            needles,
            matcher,
            threshold,
            buf,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.needles.is_empty()
    }

    /// Similarity of `window` to `name` in `[0, 1]`, or `None` when the
    /// name is not a fuzzy subsequence of the window.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn similarity(&mut self, name: &str, window: &str) -> Option<f64> {
        let atom = Atom::new(name, CaseMatching::Ignore, Normalization::Smart, AtomKind::Fuzzy, false);
        let self_score = f64::from(atom.score(Utf32Str::new(name, &mut self.buf), &mut self.matcher)?);
        let score = f64::from(atom.score(Utf32Str::new(window, &mut self.buf), &mut self.matcher)?);
        let coverage = name.chars().count() as f64 / window.chars().count().max(1) as f64;
        Some(normalize(score, self_score, coverage))
    }

    /// Every window of `text` that fuzzy-matches a needle at or above the
    /// threshold. Overlapping hits for the same needle keep the best one.
    #[allow(clippy::cast_precision_loss)]
    pub fn find(&mut self, text: &str) -> Vec<FuzzyHit> {
        let tokens = tokenize(text);
        let mut hits: Vec<FuzzyHit> = Vec::new();

        for needle in &self.needles {
            let mut best: Option<FuzzyHit> = None;
            for width in [needle.tokens, needle.tokens + 1] {
                for window in tokens.windows(width) {
                    let (start, end) = (window[0].0, window[width - 1].1);
                    let span = &text[start..end];
                    let Some(first) = span.chars().next() else { continue };
                    if first.to_ascii_lowercase() != needle.first {
                        continue;
                    }
                    let chars = span.chars().count();
                    // the window must hold the whole name plus modest noise
                    if chars < needle.chars || chars * 4 > needle.chars * 5 + 4 {
                        continue;
                    }
                    let Some(raw) = needle
                        .atom
                        .score(Utf32Str::new(span, &mut self.buf), &mut self.matcher)
                    else {
                        continue;
                    };
                    let coverage = needle.chars as f64 / chars as f64;
                    let similarity = normalize(f64::from(raw), needle.self_score, coverage);
                    if similarity < self.threshold {
                        continue;
                    }
                    let better = best.as_ref().is_none_or(|b| similarity > b.similarity);
                    if better {
                        best = Some(FuzzyHit {
                            canonical: needle.canonical.clone(),
                            matched_name: needle.text.clone(),
                            start,
                            end,
                            similarity,
                        });
                    }
                }
            }
            hits.extend(best);
        }
        hits
    }
}

fn normalize(score: f64, self_score: f64, coverage: f64) -> f64 {
    if self_score <= 0.0 {
        return 0.0;
    }
    ((score / self_score) * coverage.min(1.0)).clamp(0.0, 1.0)
}

/// Whitespace-separated tokens with surrounding punctuation trimmed, as
/// byte ranges into `text`.
fn tokenize(text: &str) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut offset = 0;
    for raw in text.split_whitespace() {
        let Some(pos) = text[offset..].find(raw) else { continue };
        let start = offset + pos;
        offset = start + raw.len();
        let trimmed_start = raw.len() - raw.trim_start_matches(is_edge_punct).len();
        let trimmed = raw.trim_matches(is_edge_punct);
        if trimmed.is_empty() {
            continue;
        }
        let s = start + trimmed_start;
        out.push((s, s + trimmed.len()));
    }
    out
}

fn is_edge_punct(c: char) -> bool {
    matches!(c, ',' | ';' | ':' | '.' | '(' | ')' | '[' | ']' | '"' | '\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyphenated_variant_matches() {
        let mut matcher = FuzzyMatcher::new([("CellProfiler", "CellProfiler")], 0.83);
        let hits = matcher.find("Nuclei were segmented in Cell-Profiler, then counted.");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].canonical, "CellProfiler");
        assert!(hits[0].similarity >= 0.83, "similarity {}", hits[0].similarity);
    }

    #[test]
    fn unrelated_word_with_same_prefix_does_not_match() {
        let mut matcher = FuzzyMatcher::new([("CellProfiler", "CellProfiler")], 0.83);
        assert!(matcher.find("Cellular proliferation was measured.").is_empty());
    }

    #[test]
    fn short_names_are_not_fuzzy_matched() {
        let matcher = FuzzyMatcher::new([("SPSS", "SPSS"), ("Fiji", "Fiji")], 0.83);
        assert!(matcher.is_empty());
    }

    #[test]
    fn long_compound_is_penalized() {
        let mut matcher = FuzzyMatcher::new([("ImageJ", "ImageJ")], 0.83);
        assert!(matcher.find("An ImageJ-based-macro-suite was written.").is_empty());
    }

    #[test]
    fn tokens_strip_edge_punctuation() {
        let text = "(CellProfiler), done.";
        let tokens = tokenize(text);
        assert_eq!(&text[tokens[0].0..tokens[0].1], "CellProfiler");
        assert_eq!(&text[tokens[1].0..tokens[1].1], "done");
    }
}
