use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;
use tm_core::{CacheTier, Section};

use crate::{CacheEntry, CacheError};

/// Entry counts by tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub minimal: usize,
    pub full: usize,
    /// Files present but unreadable; treated as absent by [`TextCacheStore::get`].
    pub corrupt: usize,
}

impl CacheStats {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.minimal + self.full
    }
}

/// Directory-backed store with one JSON file per publication.
#[derive(Debug, Clone)]
pub struct TextCacheStore {
    root: PathBuf,
}

impl TextCacheStore {
    /// Open (and create if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing the entry for `pmid`.
    #[must_use]
    pub fn path_for(&self, pmid: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_key(pmid)))
    }

    /// Cached entry for `pmid`, or `None` when absent or unreadable.
    #[must_use]
    pub fn get(&self, pmid: &str) -> Option<CacheEntry> {
        let path = self.path_for(pmid);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return None,
            Err(error) => {
                tracing::warn!(pmid, path = %path.display(), %error, "cache entry unreadable; treating as absent");
                return None;
            }
        };
        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => Some(entry),
            Err(error) => {
                tracing::warn!(pmid, path = %path.display(), %error, "cache entry corrupt; treating as absent");
                None
            }
        }
    }

    /// Whether the cached entry already satisfies `tier`.
    #[must_use]
    pub fn has_tier(&self, pmid: &str, tier: CacheTier) -> bool {
        self.get(pmid).is_some_and(|entry| entry.tier.satisfies(tier))
    }

    /// Merge `sections` into the entry for `pmid` and write it atomically.
    ///
    /// Returns the merged entry as written.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidKey`] for a blank id, or an I/O or
    /// serialization error if the write fails. The previous file is left
    /// untouched on failure.
    pub fn put(
        &self,
        pmid: &str,
        sections: BTreeMap<Section, String>,
        tier: CacheTier,
    ) -> Result<CacheEntry, CacheError> {
        if pmid.trim().is_empty() {
            return Err(CacheError::InvalidKey(pmid.to_string()));
        }
        let now = Utc::now();
        let mut entry = self
            .get(pmid)
            .unwrap_or_else(|| CacheEntry::new(pmid, tier, now));
        entry.merge(sections, tier, now);
        self.write_atomic(&self.path_for(pmid), &entry)?;
        tracing::debug!(pmid, tier = %entry.tier, sections = entry.sections.len(), "cache entry written");
        Ok(entry)
    }

    /// Delete the entry for `pmid`. Returns whether a file was removed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the file exists but cannot be removed.
    pub fn remove(&self, pmid: &str) -> Result<bool, CacheError> {
        match fs::remove_file(self.path_for(pmid)) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(error.into()),
        }
    }

    /// Delete every entry. Returns the number of files removed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the directory cannot be listed or a file
    /// cannot be removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for path in self.entry_files()? {
            fs::remove_file(path)?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Count entries by tier.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the directory cannot be listed.
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let mut stats = CacheStats::default();
        for path in self.entry_files()? {
            let parsed = fs::read(&path)
                .ok()
                .and_then(|bytes| serde_json::from_slice::<CacheEntry>(&bytes).ok());
            match parsed.map(|entry| entry.tier) {
                Some(CacheTier::Minimal) => stats.minimal += 1,
                Some(CacheTier::Full) => stats.full += 1,
                None => stats.corrupt += 1,
            }
        }
        Ok(stats)
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>, CacheError> {
        let mut files = Vec::new();
        for dirent in fs::read_dir(&self.root)? {
            let path = dirent?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn write_atomic(&self, path: &Path, entry: &CacheEntry) -> Result<(), CacheError> {
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        serde_json::to_writer_pretty(&mut tmp, entry)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;
        Ok(())
    }
}

/// Map a publication id onto a safe file stem.
///
/// Characters outside `[A-Za-z0-9._-]` become `_`; a leading dot is
/// replaced so the file is never hidden.
#[must_use]
pub fn sanitize_key(pmid: &str) -> String {
    let mut key: String = pmid
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if key.starts_with('.') {
        key.replace_range(0..1, "_");
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("12345678", "12345678")]
    #[case("PMC/123 45", "PMC_123_45")]
    #[case("../etc/passwd", "_._etc_passwd")]
    #[case("10.1000/xyz", "10.1000_xyz")]
    fn sanitizes_keys(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_key(input), expected);
    }
}
