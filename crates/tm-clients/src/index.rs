//! Publication index: the JSON Lines file listing candidate publications.
//!
//! One [`Publication`] per line. The same publication may appear more than
//! once when it was found by several queries; rows are merged by id, with
//! query origins unioned and missing fields filled from later rows.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tm_core::publication::Publication;

use crate::error::ClientError;

/// What reading the index produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexSummary {
    pub rows: usize,
    pub publications: usize,
    pub merged_duplicates: usize,
    pub skipped_invalid: usize,
}

/// Read publications from a JSON Lines index, in first-seen order.
///
/// Unreadable rows are skipped with a warning.
///
/// # Errors
///
/// Returns [`ClientError::Io`] if the file cannot be opened.
pub fn read_index(path: &Path) -> Result<(Vec<Publication>, IndexSummary), ClientError> {
    let mut summary = IndexSummary::default();
    let mut publications: Vec<Publication> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (line, row) in serde_jsonlines::json_lines::<Publication, _>(path)?.enumerate() {
        summary.rows += 1;
        let row = match row {
            Ok(row) if !row.pmid.trim().is_empty() => row,
            Ok(_) => {
                tracing::warn!(line = line + 1, "index row without a publication id; skipped");
                summary.skipped_invalid += 1;
                continue;
            }
            Err(error) => {
                tracing::warn!(line = line + 1, %error, "unreadable index row; skipped");
                summary.skipped_invalid += 1;
                continue;
            }
        };
        let key = row.pmid.trim().to_string();
        if let Some(&at) = positions.get(&key) {
            merge_rows(&mut publications[at], row);
            summary.merged_duplicates += 1;
        } else {
            positions.insert(key, publications.len());
            publications.push(row);
        }
    }
    summary.publications = publications.len();
    tracing::info!(
        path = %path.display(),
        rows = summary.rows,
        publications = summary.publications,
        skipped = summary.skipped_invalid,
        "publication index loaded"
    );
    Ok((publications, summary))
}

/// Write publications as JSON Lines.
///
/// # Errors
///
/// Returns [`ClientError::Io`] if the file cannot be written.
pub fn write_index(path: &Path, publications: &[Publication]) -> Result<(), ClientError> {
    serde_jsonlines::write_json_lines(path, publications)?;
    Ok(())
}

fn merge_rows(existing: &mut Publication, row: Publication) {
    existing.query_origins.extend(row.query_origins);
    if existing.doi.is_none() {
        existing.doi = row.doi;
    }
    if existing.journal.is_none() {
        existing.journal = row.journal;
    }
    if existing.year.is_none() {
        existing.year = row.year;
    }
    if existing.abstract_or_section().is_none() {
        existing.abstract_text = row.abstract_text;
    }
    for (section, text) in row.sections {
        existing.sections.entry(section).or_insert(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tm_core::QueryOrigin;

    #[test]
    fn duplicate_rows_merge_origins_and_fill_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("publications.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"pmid": "1", "title": "Nf1 mice", "query_origins": ["bench_science"]}"#,
                "\n",
                r#"{"pmid": "2", "title": "PedsQL in NF1", "year": 2020}"#,
                "\n",
                "not json\n",
                r#"{"pmid": "1", "title": "Nf1 mice", "year": 2022, "doi": "10.1/a", "query_origins": ["clinical"]}"#,
                "\n",
            ),
        )
        .unwrap();

        let (publications, summary) = read_index(&path).unwrap();
        assert_eq!(summary.rows, 4);
        assert_eq!(summary.skipped_invalid, 1);
        assert_eq!(summary.merged_duplicates, 1);
        assert_eq!(publications.len(), 2);
        assert_eq!(publications[0].pmid, "1");
        assert_eq!(publications[0].year, Some(2022));
        assert_eq!(publications[0].doi.as_deref(), Some("10.1/a"));
        assert!(publications[0].query_origins.contains(&QueryOrigin::BenchScience));
        assert!(publications[0].query_origins.contains(&QueryOrigin::Clinical));
    }

    #[test]
    fn written_index_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.jsonl");
        let publications = vec![Publication::new("7", "A"), Publication::new("8", "B")];
        write_index(&path, &publications).unwrap();
        let (read, _) = read_index(&path).unwrap();
        assert_eq!(read, publications);
    }

    #[test]
    fn missing_index_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(read_index(&dir.path().join("nope.jsonl")), Err(ClientError::Io(_))));
    }
}
