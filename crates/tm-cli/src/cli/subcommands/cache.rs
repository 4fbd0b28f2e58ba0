use clap::Subcommand;

/// Text cache management.
#[derive(Clone, Debug, Subcommand)]
pub enum CacheCommands {
    /// Show the cached sections of one publication.
    Show {
        /// Publication id.
        pmid: String,
    },
    /// Show entry counts by tier.
    Stats,
    /// Remove cached text.
    Clear {
        /// Remove only this publication.
        #[arg(long)]
        pmid: Option<String>,
    },
}
