//! Run bookkeeping: per-run publication counts and the deferred-work list.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Publication counts every run must report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunCounts {
    /// Publications worked through this run: extracted, and reviewed when
    /// candidates were found.
    pub processed: usize,
    /// Publications whose existing verdict document was reused.
    pub skipped_cached: usize,
    /// Publications postponed by the timeout budgeter.
    pub deferred: usize,
    /// Publications dropped after a transient failure outlived its retries.
    pub failed: usize,
}

impl RunCounts {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.processed + self.skipped_cached + self.deferred + self.failed
    }
}

/// Ordered, duplicate-free list of publication ids postponed to a later run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeferredWorkList {
    ids: Vec<String>,
}

impl DeferredWorkList {
    /// Build a list, dropping blanks and later duplicates.
    #[must_use]
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let ids = ids
            .into_iter()
            .map(Into::into)
            .map(|id: String| id.trim().to_string())
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect();
        Self { ids }
    }

    /// Parse the on-disk form: one identifier per line.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self::new(text.lines())
    }

    /// Render the on-disk form: one identifier per line, trailing newline.
    #[must_use]
    pub fn to_lines(&self) -> String {
        let mut out = String::new();
        for id in &self.ids {
            out.push_str(id);
            out.push('\n');
        }
        out
    }

    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|existing| existing == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deferred_list_is_ordered_and_deduplicated() {
        let list = DeferredWorkList::new(["3", "1", "3", " ", "2"]);
        assert_eq!(list.ids(), &["3", "1", "2"]);
        assert_eq!(list.to_lines(), "3\n1\n2\n");
    }

    #[test]
    fn deferred_list_parses_its_own_output() {
        let list = DeferredWorkList::new(["a", "b"]);
        assert_eq!(DeferredWorkList::parse(&list.to_lines()), list);
        assert!(DeferredWorkList::parse("").is_empty());
    }

    #[test]
    fn counts_total_sums_all_buckets() {
        let counts = RunCounts {
            processed: 3,
            skipped_cached: 2,
            deferred: 4,
            failed: 1,
        };
        assert_eq!(counts.total(), 10);
    }
}
