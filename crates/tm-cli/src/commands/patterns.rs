use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tm_config::ToolmineConfig;
use tm_core::ToolType;
use tm_extract::PatternSet;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::PatternsCommands;
use crate::output::output;

#[derive(Debug, Serialize)]
struct TypeRow {
    tool_type: ToolType,
    known_names: usize,
    synonyms: usize,
    regex_patterns: usize,
    aliases: usize,
    established: usize,
}

#[derive(Debug, Serialize)]
struct PatternsView {
    path: String,
    version: u32,
    updated_at: Option<DateTime<Utc>>,
    learned: usize,
    coverage_gaps: Vec<ToolType>,
    types: Vec<TypeRow>,
}

/// Handle `toolmine patterns`.
pub fn handle(action: &PatternsCommands, config: &ToolmineConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let path = config.paths.patterns_path();
    match action {
        PatternsCommands::Show => {
            let patterns = PatternSet::load_or_builtin(&path)
                .with_context(|| format!("failed to read pattern set {}", path.display()))?;
            let types = ToolType::ALL
                .into_iter()
                .map(|tool_type| {
                    let set = patterns.for_type(tool_type);
                    TypeRow {
                        tool_type,
                        known_names: set.known_names.len(),
                        synonyms: set.synonyms.len(),
                        regex_patterns: set.regex_patterns.len(),
                        aliases: set.aliases.len(),
                        established: set.established.len(),
                    }
                })
                .collect();
            output(
                &PatternsView {
                    path: path.display().to_string(),
                    version: patterns.version,
                    updated_at: patterns.updated_at,
                    learned: patterns.provenance.len(),
                    coverage_gaps: patterns.coverage_gaps(),
                    types,
                },
                flags.format,
            )
        }
        PatternsCommands::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists; pass --force to overwrite", path.display());
            }
            let patterns = PatternSet::builtin();
            patterns
                .save(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            output(
                &json!({ "path": path.display().to_string(), "version": patterns.version }),
                flags.format,
            )
        }
    }
}
