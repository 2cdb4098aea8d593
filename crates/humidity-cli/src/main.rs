mod cmd;
mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "humidity-reminder",
    about = "Email an indoor humidity target whenever the overnight forecast changes it",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, short = 'c', global = true, env = "HUMIDITY_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log at debug level when RUST_LOG is unset
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the forecast, update the recommendation and notify on change (default)
    Run,

    /// Show the persisted recommendation and last run time
    State,

    /// Validate the configuration and print the effective settings
    Check,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = cli
        .config
        .as_deref()
        .context("missing required --config <path> (or HUMIDITY_CONFIG)")
        .and_then(|config| match cli.command.unwrap_or(Commands::Run) {
            Commands::Run => cmd::run::run(config, cli.json),
            Commands::State => cmd::state::run(config, cli.json),
            Commands::Check => cmd::check::run(config, cli.json),
        });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
