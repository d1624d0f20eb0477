//! CLI argument definitions.

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SESSION_TTL_SECS};
use crate::models::StatusFilter;

/// QuickList - a minimal to-do list
#[derive(Parser, Debug)]
#[command(name = "quicklist")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Port of the server the client commands talk to
    #[arg(long, global = true, env = "QUICKLIST_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the to-do server
    Serve {
        /// Address to bind
        #[arg(long, env = "QUICKLIST_HOST", default_value = DEFAULT_HOST)]
        host: String,

        /// Seconds of inactivity before a session is discarded
        #[arg(long, env = "QUICKLIST_SESSION_TTL_SECS", default_value_t = DEFAULT_SESSION_TTL_SECS)]
        session_ttl_secs: u64,

        /// Open browser automatically
        #[arg(long)]
        open: bool,
    },

    /// Add a task
    Add {
        /// Task text
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Show pending and completed tasks
    List {
        /// Which tasks to show
        #[arg(short, long, value_enum, default_value_t = StatusArg::All)]
        status: StatusArg,

        /// Only show tasks containing this text
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Mark a task done, or pending again
    Toggle {
        /// Task ID
        id: u64,
    },

    /// Remove all completed tasks
    Clear,

    /// Export all tasks as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// End the current session, discarding its tasks
    End,
}

/// Task states that can be listed
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    /// Tasks not yet done
    Pending,
    /// Tasks marked done
    Completed,
    /// Every task
    All,
}

impl From<StatusArg> for StatusFilter {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => Self::Pending,
            StatusArg::Completed => Self::Completed,
            StatusArg::All => Self::All,
        }
    }
}
