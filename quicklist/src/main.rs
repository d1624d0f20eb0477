//! QuickList - a minimal to-do list served as a single web page.
//!
//! Users add text tasks, mark them done, and clear completed items. Each
//! browser tab or CLI user gets its own in-memory session; nothing outlives
//! the server process.
//!
//! Architecture:
//! - `quicklist serve` runs the HTTP server and the to-do page
//! - Other subcommands are a thin client that talks to the server via HTTP

mod cli;
mod config;
mod error;
mod logging;
mod models;
mod server;
mod session;
mod tasks;

use anyhow::Result;
use clap::Parser;

use cli::{execute, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    execute(cli).await
}
