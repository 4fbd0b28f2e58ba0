use anyhow::{Context, bail};
use serde::Serialize;
use serde_json::json;
use tm_cache::TextCacheStore;
use tm_config::ToolmineConfig;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::CacheCommands;
use crate::output::output;

#[derive(Debug, Serialize)]
struct StatsView {
    root: String,
    minimal: usize,
    full: usize,
    corrupt: usize,
    total: usize,
}

/// Handle `toolmine cache`.
pub fn handle(action: &CacheCommands, config: &ToolmineConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let store = TextCacheStore::open(config.paths.cache_dir()).context("failed to open text cache")?;

    match action {
        CacheCommands::Show { pmid } => {
            let Some(entry) = store.get(pmid) else {
                bail!("no cached text for {pmid}");
            };
            output(&entry, flags.format)
        }
        CacheCommands::Stats => {
            let stats = store.stats()?;
            output(
                &StatsView {
                    root: store.root().display().to_string(),
                    minimal: stats.minimal,
                    full: stats.full,
                    corrupt: stats.corrupt,
                    total: stats.total(),
                },
                flags.format,
            )
        }
        CacheCommands::Clear { pmid: Some(pmid) } => {
            let removed = store.remove(pmid)?;
            output(&json!({ "pmid": pmid, "removed": removed }), flags.format)
        }
        CacheCommands::Clear { pmid: None } => {
            let removed = store.clear()?;
            output(&json!({ "removed": removed }), flags.format)
        }
    }
}
