use anyhow::Context;
use serde::Serialize;
use tm_config::ToolmineConfig;
use tm_pipeline::{BudgetInput, measured_rate};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::BudgetArgs;
use crate::output::output;

#[derive(Debug, Serialize)]
struct BudgetView {
    total: usize,
    max_publications: usize,
    to_process: usize,
    deferred: usize,
    available_minutes: f64,
    minutes_per_publication: f64,
    rate_source: &'static str,
}

/// Handle `toolmine budget`.
pub fn handle(args: &BudgetArgs, config: &ToolmineConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let total = match args.total {
        Some(total) => total,
        None => {
            let path = config.paths.publications_path();
            tm_clients::read_index(&path)
                .with_context(|| format!("failed to read publication index {}", path.display()))?
                .0
                .len()
        }
    };

    let measured = if config.budget.use_measured_rate {
        measured_rate(&config.paths.output_dir())
    } else {
        None
    };
    let input = BudgetInput::from_config(&config.budget, args.elapsed, measured);
    let max_publications = input.max_publications()?;
    let to_process = total.min(max_publications);

    output(
        &BudgetView {
            total,
            max_publications,
            to_process,
            deferred: total - to_process,
            available_minutes: input.available_minutes(),
            minutes_per_publication: input.minutes_per_publication,
            rate_source: if measured.is_some() { "previous run" } else { "configuration" },
        },
        flags.format,
    )
}
