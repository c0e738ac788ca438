use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lpt")]
#[command(about = "Sync Life Progress Tracker data with Pantry cloud storage")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local data file
    #[arg(long, global = true, value_name = "PATH")]
    pub data_path: Option<PathBuf>,

    /// Optional path to the CLI state file (bound account, last request time)
    #[arg(long, global = true, value_name = "PATH")]
    pub state_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bind a Pantry id to this machine
    Login {
        /// Email used to derive the user id stamped into uploads
        #[arg(long)]
        email: String,
        /// Pantry id that owns the basket
        #[arg(long)]
        pantry_id: String,
    },
    /// Forget the bound Pantry id
    Logout,
    /// Show account and rate limit status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reconcile local data with the cloud basket
    Sync {
        /// Output the sync result as JSON
        #[arg(long)]
        json: bool,
        /// Fail instead of waiting when rate limited
        #[arg(long)]
        no_wait: bool,
    },
    /// Export local data as JSON
    Export {
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Replace local data with a JSON export
    Import {
        /// Export file to read
        path: PathBuf,
    },
    /// Operate on the cloud basket directly
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },
}

#[derive(Subcommand)]
pub enum RemoteCommands {
    /// Download the cloud basket without changing local data
    Pull {
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Delete the cloud basket
    Delete {
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },
}
