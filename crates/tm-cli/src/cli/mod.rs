use clap::Parser;

pub mod global;
pub mod root_commands;
pub mod subcommands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `toolmine` binary.
#[derive(Debug, Parser)]
#[command(
    name = "toolmine",
    version,
    about = "Mine, screen, and validate research tools cited in publications"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only, no progress)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file layered above the project config
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

impl Cli {
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::subcommands::{CacheCommands, PatternsCommands};
    use super::{Cli, Commands, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["toolmine", "run", "--force", "--format", "table", "--quiet"])
            .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Table);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Run(ref args) if args.force));
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        assert!(Cli::try_parse_from(["toolmine", "--format", "xml", "schema"]).is_err());
    }

    #[test]
    fn nested_subcommands_parse() {
        let cli = Cli::try_parse_from(["toolmine", "cache", "show", "12345"]).expect("cli should parse");
        assert!(matches!(
            cli.command,
            Commands::Cache { action: CacheCommands::Show { ref pmid } } if pmid == "12345"
        ));

        let cli = Cli::try_parse_from(["toolmine", "patterns", "init", "--force"]).expect("cli should parse");
        assert!(matches!(
            cli.command,
            Commands::Patterns { action: PatternsCommands::Init { force: true } }
        ));
    }

    #[test]
    fn budget_accepts_explicit_total() {
        let cli = Cli::try_parse_from(["toolmine", "budget", "--total", "500", "--elapsed", "12.5"])
            .expect("cli should parse");
        let Commands::Budget(args) = cli.command else {
            panic!("expected budget command");
        };
        assert_eq!(args.total, Some(500));
        assert!((args.elapsed - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn config_subcommand_and_config_flag_coexist() {
        let cli = Cli::try_parse_from(["toolmine", "--config", "alt.toml", "config", "--toml"])
            .expect("cli should parse");
        assert_eq!(cli.config.as_deref(), Some("alt.toml"));
        assert!(matches!(cli.command, Commands::Config(ref args) if args.toml));
    }
}
