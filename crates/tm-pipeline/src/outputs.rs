//! CSV and Markdown artifacts written at the end of a run.
//!
//! Layout under the output directory:
//!
//! ```text
//! validated/<type>.csv   filtered/<type>.csv
//! audit/{rejected,uncertain,below_threshold}.csv
//! observations.csv  missed_tools.csv  screening_log.csv
//! pattern_review.md validation_report.md
//! ```
//!
//! Tool CSVs start with `toolName`, `toolType` and the type's critical
//! fields; columns starting with `_` are tracking columns that
//! [`strip_tracking_columns`] removes before export.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tm_core::ToolType;
use tm_core::documents::MissedToolCandidate;
use tm_core::observation::Observation;

use crate::error::PipelineError;
use crate::quality::{AuditRecord, QualityReport, ToolRecord};
use crate::screening::ScreeningExclusion;

pub const VALIDATED_DIR: &str = "validated";
pub const FILTERED_DIR: &str = "filtered";
pub const AUDIT_DIR: &str = "audit";
pub const OBSERVATIONS_FILE: &str = "observations.csv";
pub const MISSED_TOOLS_FILE: &str = "missed_tools.csv";
pub const SCREENING_LOG_FILE: &str = "screening_log.csv";

const TRACKING_COLUMNS: [&str; 12] = [
    "_pmid",
    "_doi",
    "_publicationTitle",
    "_year",
    "_section",
    "_confidence",
    "_verdict",
    "_isDevelopment",
    "_isEstablished",
    "_completenessScore",
    "_contextSnippet",
    "_reasoning",
];

/// Header of `validated/<type>.csv` and `filtered/<type>.csv`.
#[must_use]
pub fn tool_columns(tool_type: ToolType) -> Vec<&'static str> {
    let mut columns = vec!["toolName", "toolType"];
    columns.extend_from_slice(tool_type.critical_fields());
    columns.extend_from_slice(&TRACKING_COLUMNS);
    columns
}

fn tracking_values(record: &ToolRecord) -> Vec<String> {
    vec![
        record.pmid.clone(),
        record.doi.clone().unwrap_or_default(),
        record.publication_title.clone(),
        record.year.map(|y| y.to_string()).unwrap_or_default(),
        record.section.as_str().to_string(),
        format!("{:.2}", record.confidence),
        record.verdict.as_str().to_string(),
        record.is_development.to_string(),
        record.is_established.to_string(),
        format!("{:.2}", record.completeness_score),
        record.context_snippet.clone(),
        record.reasoning.clone(),
    ]
}

fn tool_row(record: &ToolRecord) -> Vec<String> {
    let mut row = vec![record.tool_name.clone(), record.tool_type.display_name().to_string()];
    row.extend(
        record
            .tool_type
            .critical_fields()
            .iter()
            .map(|field| record.fields.get(*field).cloned().unwrap_or_default()),
    );
    row.extend(tracking_values(record));
    row
}

/// All merged fields as `key=value; ...`.
fn field_summary(record: &ToolRecord) -> String {
    record
        .fields
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Writes the run's artifacts under one output directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
}

impl OutputWriter {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn writer(&self, relative: &str) -> Result<csv::Writer<fs::File>, PipelineError> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(csv::Writer::from_path(path)?)
    }

    /// Every artifact derived from the quality report. One file per tool type
    /// in each tier, header-only when the type has no records.
    ///
    /// # Errors
    ///
    /// Returns an I/O or CSV error.
    pub fn write_quality(&self, report: &QualityReport) -> Result<(), PipelineError> {
        for tool_type in ToolType::ALL {
            self.write_tier(VALIDATED_DIR, tool_type, &report.validated)?;
            self.write_tier(FILTERED_DIR, tool_type, &report.filtered)?;
        }
        self.write_audit("rejected.csv", &report.rejected)?;
        self.write_audit("uncertain.csv", &report.uncertain)?;
        self.write_audit("below_threshold.csv", &report.below_threshold)?;
        tracing::info!(
            validated = report.validated.len(),
            filtered = report.filtered.len(),
            audited = report.audited(),
            "tool tables written"
        );
        Ok(())
    }

    fn write_tier(&self, tier: &str, tool_type: ToolType, records: &[ToolRecord]) -> Result<(), PipelineError> {
        let mut writer = self.writer(&format!("{tier}/{}.csv", tool_type.as_str()))?;
        writer.write_record(tool_columns(tool_type))?;
        for record in records.iter().filter(|r| r.tool_type == tool_type) {
            writer.write_record(tool_row(record))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_audit(&self, file: &str, records: &[AuditRecord]) -> Result<(), PipelineError> {
        let mut writer = self.writer(&format!("{AUDIT_DIR}/{file}"))?;
        let mut header = vec!["toolName", "toolType", "auditReason", "fields"];
        header.extend_from_slice(&TRACKING_COLUMNS);
        writer.write_record(&header)?;
        for audit in records {
            let record = &audit.record;
            let mut row = vec![
                record.tool_name.clone(),
                record.tool_type.display_name().to_string(),
                audit.reason.clone(),
                field_summary(record),
            ];
            row.extend(tracking_values(record));
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// `observations.csv`; `observations` pairs each observation with its pmid.
    ///
    /// # Errors
    ///
    /// Returns an I/O or CSV error.
    pub fn write_observations(&self, observations: &[(String, Observation)]) -> Result<(), PipelineError> {
        let mut writer = self.writer(OBSERVATIONS_FILE)?;
        writer.write_record([
            "resourceName",
            "resourceType",
            "observationType",
            "details",
            "doi",
            "_pmid",
            "_confidence",
        ])?;
        for (pmid, observation) in observations {
            writer.write_record([
                observation.resource_name.as_str(),
                observation.resource_type.display_name(),
                observation.category.as_str(),
                observation.details.as_str(),
                observation.doi.as_deref().unwrap_or(""),
                pmid.as_str(),
                format!("{:.2}", observation.confidence).as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an I/O or CSV error.
    pub fn write_missed_tools(&self, missed: &[(String, MissedToolCandidate)]) -> Result<(), PipelineError> {
        let mut writer = self.writer(MISSED_TOOLS_FILE)?;
        writer.write_record(["pmid", "toolName", "toolType", "location", "confidence", "shouldBeAdded"])?;
        for (pmid, tool) in missed {
            writer.write_record([
                pmid.as_str(),
                tool.tool_name.as_str(),
                tool.tool_type.display_name(),
                tool.location.as_str(),
                format!("{:.2}", tool.confidence).as_str(),
                tool.should_be_added.to_string().as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// `screening_log.csv`: one row per exclusion.
    ///
    /// # Errors
    ///
    /// Returns an I/O or CSV error.
    pub fn write_screening_log(&self, exclusions: &[ScreeningExclusion]) -> Result<(), PipelineError> {
        let mut writer = self.writer(SCREENING_LOG_FILE)?;
        writer.write_record(["pmid", "stage", "verdict", "confidence", "reason"])?;
        for exclusion in exclusions {
            writer.write_record([
                exclusion.pmid.as_str(),
                exclusion.stage.as_str(),
                exclusion.verdict.as_str(),
                format!("{:.2}", exclusion.confidence).as_str(),
                exclusion.reason.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write a text artifact (Markdown reports).
    ///
    /// # Errors
    ///
    /// Returns an I/O error.
    pub fn write_text(&self, file: &str, text: &str) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(file);
        fs::write(&path, text)?;
        Ok(path)
    }
}

/// Copy CSV from `input` to `output` without `_`-prefixed columns. Returns
/// the number of data rows copied.
///
/// # Errors
///
/// Returns a CSV error for malformed input or a failed write.
pub fn strip_tracking<R: Read, W: Write>(input: R, output: W) -> Result<usize, PipelineError> {
    let mut reader = csv::Reader::from_reader(input);
    let mut writer = csv::Writer::from_writer(output);

    let headers = reader.headers()?.clone();
    let keep: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, name)| !name.starts_with('_'))
        .map(|(i, _)| i)
        .collect();
    writer.write_record(keep.iter().filter_map(|&i| headers.get(i)))?;

    let mut rows = 0;
    for record in reader.records() {
        let record = record?;
        writer.write_record(keep.iter().map(|&i| record.get(i).unwrap_or("")))?;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}

/// File form of [`strip_tracking`].
///
/// # Errors
///
/// Returns an I/O or CSV error.
pub fn strip_tracking_columns(input: &Path, output: &Path) -> Result<usize, PipelineError> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    let reader = fs::File::open(input)?;
    let writer = fs::File::create(output)?;
    strip_tracking(reader, writer)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use pretty_assertions::assert_eq;
    use tm_core::{Section, Verdict};

    fn record() -> ToolRecord {
        ToolRecord {
            tool_name: "NF1 antibody H-12".into(),
            tool_type: ToolType::Antibody,
            fields: BTreeMap::from([
                ("targetAntigen".to_string(), "neurofibromin".to_string()),
                ("hostOrganism".to_string(), "mouse".to_string()),
                ("clonality".to_string(), "monoclonal".to_string()),
            ]),
            pmid: "31".into(),
            doi: Some("10.1/abc".into()),
            publication_title: "Neurofibromin, loss, and you".into(),
            year: Some(2021),
            section: Section::Methods,
            confidence: 0.75,
            verdict: Verdict::Accept,
            is_development: false,
            is_established: false,
            critical_fraction: 0.75,
            completeness_score: 22.5,
            context_snippet: "probed with NF1 antibody H-12".into(),
            reasoning: "named clone with vendor".into(),
        }
    }

    #[test]
    fn tool_header_has_critical_fields_then_tracking() {
        let columns = tool_columns(ToolType::Antibody);
        assert_eq!(
            &columns[..6],
            &["toolName", "toolType", "targetAntigen", "hostOrganism", "clonality", "reactiveSpecies"]
        );
        assert_eq!(columns[6], "_pmid");
        assert_eq!(columns.last(), Some(&"_reasoning"));
    }

    #[test]
    fn writes_every_type_file_even_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let out = OutputWriter::new(dir.path());
        let report = QualityReport {
            validated: vec![record()],
            filtered: vec![record()],
            ..QualityReport::default()
        };
        out.write_quality(&report).unwrap();

        for tool_type in ToolType::ALL {
            assert!(dir.path().join(format!("validated/{}.csv", tool_type.as_str())).exists());
        }
        let antibody = fs::read_to_string(dir.path().join("validated/antibody.csv")).unwrap();
        assert_eq!(antibody.lines().count(), 2);
        assert!(antibody.contains("NF1 antibody H-12,Antibody,neurofibromin,mouse,monoclonal,,31,10.1/abc"));
        assert!(antibody.contains("\"Neurofibromin, loss, and you\""));
        assert!(dir.path().join("audit/below_threshold.csv").exists());
    }

    #[test]
    fn strip_removes_underscore_columns() {
        let input = "toolName,toolType,_pmid,vendor,_reasoning\nImageJ,Computational Tool,1,NIH,\"ok, fine\"\n";
        let mut output = Vec::new();
        let rows = strip_tracking(input.as_bytes(), &mut output).unwrap();
        assert_eq!(rows, 1);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "toolName,toolType,vendor\nImageJ,Computational Tool,NIH\n"
        );
    }
}
