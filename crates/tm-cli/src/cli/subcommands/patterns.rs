use clap::Subcommand;

/// Pattern set management.
#[derive(Clone, Debug, Subcommand)]
pub enum PatternsCommands {
    /// Summarize the pattern set by tool type.
    Show,
    /// Write the built-in seed patterns to the configured path.
    Init {
        /// Overwrite an existing pattern set.
        #[arg(long)]
        force: bool,
    },
}
