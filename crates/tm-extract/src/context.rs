//! Context snippets and metadata read from the text around a mention.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tm_core::ToolType;

/// Characters of context kept on each side of a mention.
pub const SNIPPET_RADIUS: usize = 150;

/// Vendors recognized without an explicit "purchased from" phrase.
pub const KNOWN_VENDORS: &[&str] = &[
    "Abcam",
    "Cell Signaling Technology",
    "Santa Cruz Biotechnology",
    "Sigma-Aldrich",
    "Thermo Fisher Scientific",
    "Invitrogen",
    "BD Biosciences",
    "BioLegend",
    "R&D Systems",
    "Proteintech",
    "MilliporeSigma",
    "Merck Millipore",
    "ATCC",
    "Jackson Laboratory",
    "Charles River",
    "Addgene",
];

static VERSION_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\s,(\[]*(?:v\.?\s?|version\s+|ver\.\s?)?(\d+(?:\.\d+)+[a-z0-9]*|\d+[a-z])\b")
        .expect("version regex must compile")
});

static VENDOR_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:purchased|obtained|acquired|bought|ordered)\s+from\s+(?:the\s+)?([A-Z][A-Za-z0-9&.\-]*(?:\s+[A-Z][A-Za-z0-9&.\-]*){0,3})",
    )
    .expect("vendor regex must compile")
});

static CATALOG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:cat(?:alog(?:ue)?)?\.?\s*(?:no\.?|number|#)|product\s*(?:no\.?|#))\s*:?\s*([A-Z0-9][A-Z0-9\-]{2,})")
        .expect("catalog regex must compile")
});

static RRID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"RRID:\s?([A-Za-z]+_[A-Za-z0-9_\-]+)").expect("rrid regex must compile"));

/// Largest char boundary `<= index`.
pub(crate) fn floor_boundary(text: &str, index: usize) -> usize {
    let mut i = index.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest char boundary `>= index`.
pub(crate) fn ceil_boundary(text: &str, index: usize) -> usize {
    let mut i = index.min(text.len());
    while !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Byte window of `radius` bytes on each side of `start..end`, snapped to
/// char boundaries.
pub(crate) fn window(text: &str, start: usize, end: usize, radius: usize) -> (usize, usize) {
    (
        floor_boundary(text, start.saturating_sub(radius)),
        ceil_boundary(text, end.saturating_add(radius)),
    )
}

/// Whitespace-collapsed text around `start..end`.
#[must_use]
pub fn snippet(text: &str, start: usize, end: usize) -> String {
    let (from, to) = window(text, start, end, SNIPPET_RADIUS);
    text[from..to].split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Version string immediately following a mention (`ImageJ (v1.53k)`).
#[must_use]
pub fn version_after(text: &str, end: usize) -> Option<String> {
    let to = ceil_boundary(text, end.saturating_add(30));
    let after = &text[ceil_boundary(text, end)..to];
    VERSION_AFTER
        .captures(after)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Metadata fields readable from the text around a mention.
#[must_use]
pub fn read_metadata(text: &str, start: usize, end: usize, tool_type: ToolType) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    let (from, to) = window(text, start, end, 100);
    let around = &text[from..to];

    if tool_type == ToolType::ComputationalTool {
        if let Some(version) = version_after(text, end) {
            fields.insert("softwareVersion".to_string(), version);
        }
    }

    let vendor = VENDOR_PHRASE
        .captures(around)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end_matches(['.', ',']).to_string())
        .or_else(|| {
            KNOWN_VENDORS
                .iter()
                .find(|vendor| around.contains(**vendor))
                .map(|vendor| (*vendor).to_string())
        });
    if let Some(vendor) = vendor {
        fields.insert("vendor".to_string(), vendor);
    }

    if let Some(catalog) = CATALOG.captures(around).and_then(|c| c.get(1)) {
        fields.insert("catalogNumber".to_string(), catalog.as_str().to_string());
    }

    if let Some(rrid) = RRID.captures(around).and_then(|c| c.get(1)) {
        fields.insert("rrid".to_string(), format!("RRID:{}", rrid.as_str()));
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("ImageJ (v1.53k) was used", "1.53k")]
    #[case("ImageJ version 2.0.0 and", "2.0.0")]
    #[case("ImageJ, v. 1.8", "1.8")]
    fn reads_version_after_name(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(version_after(text, "ImageJ".len()).as_deref(), Some(expected));
    }

    #[test]
    fn no_version_when_text_follows() {
        assert_eq!(version_after("ImageJ software was used", 6), None);
    }

    #[test]
    fn reads_vendor_catalog_and_rrid() {
        let text = "anti-GFAP (Abcam, Cat. No. ab7260, RRID:AB_305808) was diluted 1:500.";
        let fields = read_metadata(text, 0, 9, ToolType::Antibody);
        assert_eq!(fields.get("vendor").map(String::as_str), Some("Abcam"));
        assert_eq!(fields.get("catalogNumber").map(String::as_str), Some("ab7260"));
        assert_eq!(fields.get("rrid").map(String::as_str), Some("RRID:AB_305808"));
    }

    #[test]
    fn snippet_is_collapsed_and_bounded() {
        let text = format!("{}ImageJ\n\n  was used{}", "x".repeat(400), "y".repeat(400));
        let start = 400;
        let s = snippet(&text, start, start + 6);
        assert!(s.contains("ImageJ was used"));
        assert!(s.len() <= 6 + 2 * SNIPPET_RADIUS);
    }

    #[test]
    fn snippet_respects_multibyte_boundaries() {
        let text = "é".repeat(200) + "ImageJ" + &"ü".repeat(200);
        let start = text.find("ImageJ").unwrap();
        let s = snippet(&text, start, start + 6);
        assert!(s.contains("ImageJ"));
    }
}
