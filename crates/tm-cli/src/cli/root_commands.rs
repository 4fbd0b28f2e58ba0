use clap::{Args, Subcommand};

use crate::cli::subcommands::{CacheCommands, PatternsCommands};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Run the full pipeline over the publication index.
    Run(RunArgs),
    /// Show how many publications fit the time budget.
    Budget(BudgetArgs),
    /// Text cache inspection and cleanup.
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
    /// Pattern set inspection and seeding.
    Patterns {
        #[command(subcommand)]
        action: PatternsCommands,
    },
    /// Print the JSON Schema of a reviewer document.
    Schema(SchemaArgs),
    /// Copy output tables without tracking columns.
    Export(ExportArgs),
    /// Show the effective configuration after all layers are merged.
    Config(ConfigArgs),
}

#[derive(Clone, Debug, Args)]
pub struct RunArgs {
    /// Re-review publications that already have verdict documents.
    #[arg(long)]
    pub force: bool,

    /// Skip title and abstract screening.
    #[arg(long)]
    pub skip_screening: bool,

    /// Skip observation extraction.
    #[arg(long)]
    pub no_observations: bool,

    /// Override the number of parallel review workers.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Publication index (JSON Lines) to read instead of the configured one.
    #[arg(long)]
    pub index: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct BudgetArgs {
    /// Number of publications; defaults to the size of the publication index.
    #[arg(long)]
    pub total: Option<usize>,

    /// Minutes already spent in the current run.
    #[arg(long, default_value_t = 0.0)]
    pub elapsed: f64,
}

#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    /// Schema name; lists the available schemas when omitted.
    pub name: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct ExportArgs {
    /// Destination directory; defaults to `<output_dir>/export`.
    #[arg(long)]
    pub out: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct ConfigArgs {
    /// Print as TOML, ready to save as `.toolmine/config.toml`.
    #[arg(long)]
    pub toml: bool,
}
