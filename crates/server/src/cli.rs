//! Command-line surface.
//!
//! Grounded on the reference `embed_server.py`'s `argparse` subcommand set
//! (`start`, `stop`, `status`, and a hidden `_daemon` used only to relaunch
//! itself after forking) and the subcommand-enum shape from
//! `odgrim-abathur-swarm`'s `cli::types::Cli`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "twilog-server")]
#[command(about = "Twilog semantic search daemon", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the daemon in the background, waiting for it to finish loading
    Start {
        /// Embedding model identifier, reported back via get_status
        #[arg(short, long)]
        model: String,
    },

    /// Stop a running daemon
    Stop,

    /// Report whether a daemon is running and ready
    Status,

    /// Run as the backgrounded daemon process. Not meant to be invoked
    /// directly; `start` launches this itself.
    #[command(hide = true)]
    Daemon {
        #[arg(short, long)]
        model: String,
    },
}
