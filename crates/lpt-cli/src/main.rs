//! lpt - command-line front end for Life Progress Tracker cloud sync
//!
//! Keeps a local JSON copy of the tracker data and reconciles it with a
//! Pantry basket, one rate-limited request at a time.

mod cli;
mod commands;
mod error;
mod state;


use std::path::PathBuf;

use clap::Parser;
use lpt_core::config::SyncConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::{run_login, run_logout};
use crate::commands::common::CliContext;
use crate::commands::data::{run_export, run_import};
use crate::commands::remote::run_remote;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;
use crate::state::{default_data_path, default_state_path};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = SyncConfig::from_env()?;
    let context = CliContext::new(
        resolve_path(cli.data_path, default_data_path)?,
        resolve_path(cli.state_path, default_state_path)?,
        config,
    )?;

    match cli.command {
        Commands::Login { email, pantry_id } => run_login(&context, &email, &pantry_id)?,
        Commands::Logout => run_logout(&context)?,
        Commands::Status { json } => run_status(&context, json)?,
        Commands::Sync { json, no_wait } => run_sync(&context, json, no_wait).await?,
        Commands::Export { output } => run_export(&context, output.as_deref()).await?,
        Commands::Import { path } => run_import(&context, &path).await?,
        Commands::Remote { command } => run_remote(&context, command).await?,
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env();
    let filter = match "lpt=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_path(
    explicit: Option<PathBuf>,
    default: impl FnOnce() -> Result<PathBuf, CliError>,
) -> Result<PathBuf, CliError> {
    explicit.map_or_else(default, Ok)
}
