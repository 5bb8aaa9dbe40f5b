//! home-services CLI.
//!
//! Provides commands for:
//! - `serve`: Start the dashboard server
//! - `watch`: Follow a running dashboard's reload signal without a browser
//! - `unit`: Print the systemd unit for the dashboard

mod commands;
mod error;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ServeArgs, UnitArgs, WatchArgs};
use error::CliError;
use output::Output;

/// Application version from Cargo.toml.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Home services dashboard.
#[derive(Parser)]
#[command(name = "home-services", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dashboard server.
    Serve(ServeArgs),
    /// Reload on catalog changes of a running dashboard.
    Watch(WatchArgs),
    /// Render the systemd unit file.
    Unit(UnitArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Serve(args) => args.verbose,
            Self::Watch(args) => args.verbose,
            Self::Unit(_) => false,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new();

    // RUST_LOG wins; --verbose lowers the default from INFO to DEBUG
    let default_level = if cli.command.verbose() { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.failure(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Serve(args) => runtime()?.block_on(args.execute(VERSION)),
        Commands::Watch(args) => runtime()?.block_on(args.execute()),
        Commands::Unit(args) => args.execute(),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    Ok(tokio::runtime::Runtime::new()?)
}
