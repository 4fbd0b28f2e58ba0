//! Cache-first text acquisition.
//!
//! Every section read goes through the text cache: a cached entry at the
//! requested tier (or above) answers without touching the source, and every
//! successful fetch is merged into the cache before it is used.

use std::sync::Arc;

use tm_cache::{CacheEntry, TextCacheStore};
use tm_clients::{FullTextSource, RetryPolicy, SectionMap, with_retry};
use tm_core::publication::Publication;
use tm_core::{CacheTier, Section};

use crate::error::PipelineError;

/// How a tier request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The cache already held the tier.
    Cached,
    /// The source returned text, now cached.
    Fetched,
    /// The source has no text for this publication.
    Unavailable,
}

#[derive(Clone)]
pub struct TextFetcher {
    cache: TextCacheStore,
    source: Arc<dyn FullTextSource>,
    policy: RetryPolicy,
}

impl TextFetcher {
    #[must_use]
    pub fn new(cache: TextCacheStore, source: Arc<dyn FullTextSource>, policy: RetryPolicy) -> Self {
        Self { cache, source, policy }
    }

    #[must_use]
    pub const fn cache(&self) -> &TextCacheStore {
        &self.cache
    }

    /// Make sure `publication` carries the sections of `tier`.
    ///
    /// Absence of text is not an error; whatever the cache holds is still
    /// loaded. A source that keeps failing after retries is.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Client`] once retries are exhausted, or
    /// [`PipelineError::Cache`] if the fetched text cannot be written.
    pub async fn ensure_tier(&self, publication: &mut Publication, tier: CacheTier) -> Result<FetchOutcome, PipelineError> {
        let pmid = publication.pmid.clone();
        let existing = self.cache.get(&pmid);
        if let Some(entry) = &existing {
            if entry.tier.satisfies(tier) {
                load_sections(publication, entry);
                return Ok(FetchOutcome::Cached);
            }
        }

        let fetched = with_retry(&self.policy, self.source.name(), || self.source.fetch(&pmid, tier)).await?;
        let Some(mut sections) = fetched else {
            if let Some(entry) = &existing {
                load_sections(publication, entry);
            }
            tracing::debug!(pmid, %tier, source = self.source.name(), "no text available");
            return Ok(FetchOutcome::Unavailable);
        };

        keep_index_abstract(publication, &mut sections);
        let entry = self.cache.put(&pmid, sections, tier)?;
        load_sections(publication, &entry);
        tracing::debug!(pmid, %tier, sections = entry.sections.len(), "text fetched and cached");
        Ok(FetchOutcome::Fetched)
    }
}

/// Copy cached sections onto the publication; cached text wins over blanks only.
fn load_sections(publication: &mut Publication, entry: &CacheEntry) {
    for (section, text) in &entry.sections {
        if !text.trim().is_empty() {
            publication.sections.insert(*section, text.clone());
        }
    }
}

/// Cache the index abstract alongside fetched sections that lack one.
fn keep_index_abstract(publication: &Publication, sections: &mut SectionMap) {
    if sections.contains_key(&Section::Abstract) {
        return;
    }
    if let Some(text) = publication.abstract_text.as_deref().filter(|t| !t.trim().is_empty()) {
        sections.insert(Section::Abstract, text.to_string());
    }
}
