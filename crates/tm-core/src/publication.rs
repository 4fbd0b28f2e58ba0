use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{QueryOrigin, Section};

/// A publication discovered from the upstream index.
///
/// Section text starts empty and is filled from the text cache; a
/// publication is never deleted, only superseded by a re-fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Publication {
    /// PMID or equivalent stable identifier.
    pub pmid: String,
    #[serde(default)]
    pub doi: Option<String>,
    pub title: String,
    #[serde(default)]
    pub journal: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub sections: BTreeMap<Section, String>,
    #[serde(default)]
    pub query_origins: BTreeSet<QueryOrigin>,
}

impl Publication {
    /// Minimal publication with only an id and title, mostly for tests and
    /// index rows that lack everything else.
    #[must_use]
    pub fn new(pmid: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            pmid: pmid.into(),
            doi: None,
            title: title.into(),
            journal: None,
            year: None,
            abstract_text: None,
            sections: BTreeMap::new(),
            query_origins: BTreeSet::new(),
        }
    }

    /// Abstract text if present and non-blank, from the index row or the
    /// cached abstract section.
    #[must_use]
    pub fn abstract_or_section(&self) -> Option<&str> {
        self.abstract_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .or_else(|| {
                self.sections
                    .get(&Section::Abstract)
                    .map(String::as_str)
                    .filter(|text| !text.trim().is_empty())
            })
    }

    /// All text available for mining, paired with its section.
    ///
    /// The title always comes first; the abstract comes from the index row
    /// when no abstract section is cached.
    #[must_use]
    pub fn mining_text(&self) -> Vec<(Section, &str)> {
        let mut out = vec![(Section::Title, self.title.as_str())];
        if !self.sections.contains_key(&Section::Abstract) {
            if let Some(text) = self.abstract_text.as_deref() {
                out.push((Section::Abstract, text));
            }
        }
        out.extend(
            self.sections
                .iter()
                .filter(|(_, text)| !text.trim().is_empty())
                .map(|(section, text)| (*section, text.as_str())),
        );
        out
    }

    /// Concatenation of every available section, used by the context
    /// classifier and as the reviewer excerpt.
    #[must_use]
    pub fn full_text(&self) -> String {
        self.mining_text()
            .into_iter()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Whether any section beyond title/abstract is available.
    #[must_use]
    pub fn has_body_text(&self) -> bool {
        self.sections
            .iter()
            .any(|(section, text)| *section != Section::Abstract && !text.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserializes_index_row_with_abstract_key() {
        let row = r#"{
            "pmid": "12345",
            "title": "Nf1 mice",
            "abstract": "We studied mice.",
            "year": 2021,
            "query_origins": ["bench_science", "clinical"]
        }"#;
        let publication: Publication = serde_json::from_str(row).unwrap();
        assert_eq!(publication.abstract_text.as_deref(), Some("We studied mice."));
        assert_eq!(publication.query_origins.len(), 2);
        assert!(publication.sections.is_empty());
    }

    #[test]
    fn abstract_falls_back_to_cached_section() {
        let mut publication = Publication::new("1", "t");
        publication.abstract_text = Some("   ".into());
        assert_eq!(publication.abstract_or_section(), None);

        publication
            .sections
            .insert(Section::Abstract, "cached abstract".into());
        assert_eq!(publication.abstract_or_section(), Some("cached abstract"));
    }

    #[test]
    fn mining_text_does_not_duplicate_abstract() {
        let mut publication = Publication::new("1", "Title");
        publication.abstract_text = Some("index abstract".into());
        publication
            .sections
            .insert(Section::Abstract, "cached abstract".into());
        publication.sections.insert(Section::Methods, "methods".into());

        let sections: Vec<Section> = publication.mining_text().iter().map(|(s, _)| *s).collect();
        assert_eq!(sections, vec![Section::Title, Section::Abstract, Section::Methods]);
        assert!(publication.has_body_text());
    }
}
