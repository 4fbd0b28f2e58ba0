use anyhow::Context;
use clap::Parser;

mod cli;
mod commands;
mod output;
mod progress;
mod ui;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("toolmine error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let flags = cli.global_flags();
    ui::init(&flags);

    // Schema output needs no configuration.
    if let cli::Commands::Schema(args) = &cli.command {
        return commands::schema::handle(args, &flags);
    }

    let config = load_config(flags.config.as_deref())?;
    commands::dispatch::dispatch(cli.command, config, &flags).await
}

fn load_config(path: Option<&str>) -> anyhow::Result<tm_config::ToolmineConfig> {
    let _ = dotenvy::dotenv();
    let config = match path {
        Some(path) => tm_config::ToolmineConfig::load_from(std::path::Path::new(path))
            .with_context(|| format!("failed to load configuration from {path}"))?,
        None => tm_config::ToolmineConfig::load().context("failed to load configuration")?,
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("TOOLMINE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
