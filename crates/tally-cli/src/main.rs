//! Tally CLI - Offline-first inventory store from the command line
//!
//! Local edits work without a network; `tally sync` replicates them.

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::{load_settings, resolve_config_path, resolve_db_path};
use crate::commands::config::run_config;
use crate::commands::health::run_health;
use crate::commands::outbox::run_outbox;
use crate::commands::productos::run_productos;
use crate::commands::sync::run_sync;
use crate::error::CliError;

fn main() {
    if let Err(error) = run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tally=info,tally_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let config_path = resolve_config_path(cli.config);

    match cli.command {
        Commands::Sync { command } => run_sync(command, &load_settings(&config_path)?, &db_path)?,
        Commands::Outbox { command } => {
            run_outbox(command, &load_settings(&config_path)?, &db_path)?;
        }
        Commands::Health => run_health(&load_settings(&config_path)?)?,
        Commands::Config { command } => run_config(command, &config_path)?,
        Commands::Productos { command } => run_productos(command, &db_path)?,
    }

    Ok(())
}
