//! AssetMirror CLI - Command-line interface
//!
//! Mirrors the published asset catalog into a local directory, downloading
//! only the assets whose hash changed since the previous run.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use assetmirror::config::config_file_path;
use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::sync::SyncArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "assetmirror", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    /// Configuration file to use instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download assets that changed since the last run
    Sync(SyncArgs),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match assetmirror::logging::init_logging(cli.verbose, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, cli.config.unwrap_or_else(config_file_path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config_path: PathBuf) -> Result<(), CliError> {
    match command {
        Commands::Sync(args) => commands::sync::run(args, &config_path),
        Commands::Config(command) => commands::config::run(command, &config_path),
    }
}
