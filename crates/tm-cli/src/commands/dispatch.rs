use tm_config::ToolmineConfig;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(command: Commands, config: ToolmineConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => commands::run::handle(&args, config, flags).await,
        Commands::Budget(args) => commands::budget::handle(&args, &config, flags),
        Commands::Cache { action } => commands::cache::handle(&action, &config, flags),
        Commands::Patterns { action } => commands::patterns::handle(&action, &config, flags),
        Commands::Schema(args) => commands::schema::handle(&args, flags),
        Commands::Export(args) => commands::export::handle(&args, &config, flags),
        Commands::Config(args) => commands::config::handle(&args, &config, flags),
    }
}
