use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::Serialize;
use tm_config::ToolmineConfig;
use tm_pipeline::outputs::{FILTERED_DIR, OBSERVATIONS_FILE, VALIDATED_DIR};
use tm_pipeline::strip_tracking_columns;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ExportArgs;
use crate::output::output;

#[derive(Debug, Serialize)]
struct ExportedFile {
    file: String,
    rows: usize,
}

/// CSV files directly under `dir`, sorted by name.
fn csv_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Handle `toolmine export`.
pub fn handle(args: &ExportArgs, config: &ToolmineConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let output_dir = config.paths.output_dir();
    let dest = args.out.as_ref().map_or_else(|| output_dir.join("export"), PathBuf::from);

    let mut sources: Vec<(PathBuf, PathBuf)> = Vec::new();
    for tier in [VALIDATED_DIR, FILTERED_DIR] {
        for file in csv_files(&output_dir.join(tier))? {
            if let Some(name) = file.file_name() {
                let target = dest.join(tier).join(name);
                sources.push((file, target));
            }
        }
    }
    let observations = output_dir.join(OBSERVATIONS_FILE);
    if observations.is_file() {
        sources.push((observations, dest.join(OBSERVATIONS_FILE)));
    }
    if sources.is_empty() {
        bail!("no output tables under {}; run `toolmine run` first", output_dir.display());
    }

    let mut exported = Vec::with_capacity(sources.len());
    for (source, target) in sources {
        let rows = strip_tracking_columns(&source, &target)
            .with_context(|| format!("failed to export {}", source.display()))?;
        exported.push(ExportedFile {
            file: target.display().to_string(),
            rows,
        });
    }
    output(&exported, flags.format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn csv_files_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.csv", "a.csv", "notes.md"] {
            std::fs::write(dir.path().join(name), "x\n").unwrap();
        }
        let names: Vec<_> = csv_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
        assert!(csv_files(&dir.path().join("missing")).unwrap().is_empty());
    }
}
