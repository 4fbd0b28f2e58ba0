use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tm_core::{CacheTier, Section};

/// Cached text for one publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub pmid: String,
    pub tier: CacheTier,
    pub fetched_at: DateTime<Utc>,
    #[serde(default)]
    pub sections: BTreeMap<Section, String>,
}

impl CacheEntry {
    #[must_use]
    pub fn new(pmid: impl Into<String>, tier: CacheTier, fetched_at: DateTime<Utc>) -> Self {
        Self {
            pmid: pmid.into(),
            tier,
            fetched_at,
            sections: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn section(&self, section: Section) -> Option<&str> {
        self.sections
            .get(&section)
            .map(String::as_str)
            .filter(|text| !text.trim().is_empty())
    }

    /// Merge freshly fetched sections into this entry.
    ///
    /// The tier only moves forward. A cached section is replaced only by
    /// non-blank text; blank incoming sections never erase anything.
    pub fn merge(
        &mut self,
        sections: BTreeMap<Section, String>,
        tier: CacheTier,
        fetched_at: DateTime<Utc>,
    ) {
        for (section, text) in sections {
            if text.trim().is_empty() {
                self.sections.entry(section).or_default();
                continue;
            }
            self.sections.insert(section, text);
        }
        self.tier = self.tier.max(tier);
        self.fetched_at = fetched_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sections(pairs: &[(Section, &str)]) -> BTreeMap<Section, String> {
        pairs.iter().map(|(s, t)| (*s, (*t).to_string())).collect()
    }

    #[test]
    fn blank_text_never_erases() {
        let now = Utc::now();
        let mut entry = CacheEntry::new("1", CacheTier::Minimal, now);
        entry.merge(sections(&[(Section::Methods, "We used ImageJ.")]), CacheTier::Minimal, now);
        entry.merge(sections(&[(Section::Methods, "  ")]), CacheTier::Minimal, now);
        assert_eq!(entry.section(Section::Methods), Some("We used ImageJ."));
    }

    #[test]
    fn tier_never_downgrades() {
        let now = Utc::now();
        let mut entry = CacheEntry::new("1", CacheTier::Full, now);
        entry.merge(BTreeMap::new(), CacheTier::Minimal, now);
        assert_eq!(entry.tier, CacheTier::Full);
    }
}
