//! Command-line interface: the server entry point and a thin HTTP client.

mod args;
mod client;
mod commands;

pub use args::Cli;
pub use client::ApiClient;
pub use commands::execute;
