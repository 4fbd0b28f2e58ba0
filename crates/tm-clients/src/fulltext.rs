//! Full-text sources: fetch named sections of a publication for a tier.
//!
//! Absence of full text is a normal outcome (`Ok(None)`), not an error.
//! Two payload shapes are accepted from both sources:
//!
//! ```text
//! {"pmid": "123", "sections": {"methods": "...", "results": "..."}}
//! {"methods": "...", "results": "..."}
//! ```
//!
//! Section keys are matched leniently ("Materials and Methods" → methods);
//! unknown keys are ignored. Only the sections belonging to the requested
//! tier are returned.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tm_config::FullTextConfig;
use tm_core::{CacheTier, Section};

use crate::error::ClientError;
use crate::http::{build_client, check_response};

pub type SectionMap = BTreeMap<Section, String>;

#[async_trait]
pub trait FullTextSource: Send + Sync {
    /// Short name for log events.
    fn name(&self) -> &'static str;

    /// Sections of `pmid` for `tier`, or `None` when no text is available.
    async fn fetch(&self, pmid: &str, tier: CacheTier) -> Result<Option<SectionMap>, ClientError>;
}

/// Decode a section payload and keep the sections of `tier`.
///
/// # Errors
///
/// Returns [`ClientError::Parse`] when the payload is not a JSON object.
pub fn sections_from_payload(payload: &[u8], tier: CacheTier) -> Result<SectionMap, ClientError> {
    let value: serde_json::Value =
        serde_json::from_slice(payload).map_err(|e| ClientError::Parse(format!("section payload: {e}")))?;
    let object = value
        .get("sections")
        .and_then(serde_json::Value::as_object)
        .or_else(|| value.as_object())
        .ok_or_else(|| ClientError::Parse("section payload is not an object".to_string()))?;

    let wanted = tier.sections();
    let mut sections = SectionMap::new();
    for (key, text) in object {
        let Ok(section) = key.parse::<Section>() else {
            continue;
        };
        let Some(text) = text.as_str() else {
            continue;
        };
        if wanted.contains(&section) && !text.trim().is_empty() {
            sections.insert(section, text.to_string());
        }
    }
    Ok(sections)
}

// ── Directory ──────────────────────────────────────────────────────

/// A directory of `<pmid>.json` files.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FullTextSource for DirectorySource {
    fn name(&self) -> &'static str {
        "directory"
    }

    async fn fetch(&self, pmid: &str, tier: CacheTier) -> Result<Option<SectionMap>, ClientError> {
        let path = self.root.join(format!("{}.json", tm_cache::sanitize_key(pmid)));
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        let sections = sections_from_payload(&bytes, tier)?;
        Ok((!sections.is_empty()).then_some(sections))
    }
}

// ── HTTP ───────────────────────────────────────────────────────────

/// A JSON endpoint serving `GET {base_url}/{pmid}?tier=minimal|full`.
pub struct HttpSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, pmid: &str, tier: CacheTier) -> String {
        format!("{}/{}?tier={}", self.base_url, urlencoding::encode(pmid.trim()), tier.as_str())
    }
}

#[async_trait]
impl FullTextSource for HttpSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, pmid: &str, tier: CacheTier) -> Result<Option<SectionMap>, ClientError> {
        let resp = self.http.get(self.url_for(pmid, tier)).send().await?;
        if resp.status() == 404 {
            return Ok(None);
        }
        let resp = check_response(resp).await?;
        let bytes = resp.bytes().await?;
        let sections = sections_from_payload(&bytes, tier)?;
        Ok((!sections.is_empty()).then_some(sections))
    }
}

// ── None ───────────────────────────────────────────────────────────

/// Used when no source is configured: every fetch finds nothing.
pub struct NoFullText;

#[async_trait]
impl FullTextSource for NoFullText {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn fetch(&self, _pmid: &str, _tier: CacheTier) -> Result<Option<SectionMap>, ClientError> {
        Ok(None)
    }
}

/// Source selected by configuration: a directory wins over an endpoint.
///
/// # Errors
///
/// Returns [`ClientError::Http`] if the HTTP client cannot be built.
pub fn fulltext_source_from_config(config: &FullTextConfig) -> Result<Arc<dyn FullTextSource>, ClientError> {
    if !config.directory.is_empty() {
        return Ok(Arc::new(DirectorySource::new(&config.directory)));
    }
    if !config.base_url.is_empty() {
        return Ok(Arc::new(HttpSource::new(&config.base_url, config.timeout_secs)?));
    }
    tracing::info!("no full-text source configured; mining titles and abstracts only");
    Ok(Arc::new(NoFullText))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn payload_keeps_only_tier_sections() {
        let payload = br#"{"pmid": "1", "sections": {
            "Materials and Methods": "We used ImageJ.",
            "results": "Tumors grew.",
            "abstract": "Short.",
            "supplement": "ignored"
        }}"#;
        let minimal = sections_from_payload(payload, CacheTier::Minimal).unwrap();
        assert_eq!(
            minimal.keys().copied().collect::<Vec<_>>(),
            vec![Section::Abstract, Section::Methods]
        );
        let full = sections_from_payload(payload, CacheTier::Full).unwrap();
        assert_eq!(full.get(&Section::Results).map(String::as_str), Some("Tumors grew."));
    }

    #[test]
    fn payload_accepts_flat_object() {
        let sections = sections_from_payload(br#"{"methods": "m", "discussion": "  "}"#, CacheTier::Full).unwrap();
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn payload_rejects_non_object() {
        assert!(matches!(
            sections_from_payload(b"[1, 2]", CacheTier::Full),
            Err(ClientError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn directory_source_reads_and_reports_absence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("42.json"), r#"{"methods": "Cells were cultured."}"#).unwrap();
        let source = DirectorySource::new(dir.path());

        let found = source.fetch("42", CacheTier::Minimal).await.unwrap().unwrap();
        assert_eq!(found.get(&Section::Methods).map(String::as_str), Some("Cells were cultured."));
        assert!(source.fetch("43", CacheTier::Minimal).await.unwrap().is_none());
    }

    #[test]
    fn http_url_encodes_id_and_tier() {
        let source = HttpSource::new("https://text.example.org/api/", 5).unwrap();
        assert_eq!(
            source.url_for("PMC 1", CacheTier::Full),
            "https://text.example.org/api/PMC%201?tier=full"
        );
    }

    #[tokio::test]
    async fn unconfigured_source_finds_nothing() {
        let source = fulltext_source_from_config(&FullTextConfig::default()).unwrap();
        assert_eq!(source.name(), "none");
        assert!(source.fetch("1", CacheTier::Full).await.unwrap().is_none());
    }
}
