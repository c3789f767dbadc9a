//! CLI module for the RiceScan API server.

pub mod serve;

use clap::{Parser, Subcommand};

/// RiceScan API - backend for the rice leaf disease identification app
#[derive(Parser)]
#[command(name = "ricescan-api")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,
}
