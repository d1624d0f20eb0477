//! CLI command execution.
//!
//! Everything except `serve` is a thin client: tasks live in a session on the
//! server, and the CLI only remembers which session is its own.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::{self, ServerConfig};
use crate::models::{StatusFilter, Task, TaskId};
use crate::server;
use crate::session::{clear_session_file, read_session_file, write_session_file, SessionId};

use super::args::{Cli, Commands};
use super::client::ApiClient;

const NOTHING_ADDED: &str = "Nothing added (empty task).";

/// Execute the parsed CLI.
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve {
            host,
            session_ttl_secs,
            open,
        } => {
            let config = ServerConfig::new(&host, cli.port, session_ttl_secs, open)?;
            server::start_server(config).await
        }
        Commands::Add { text } => {
            let text = text.join(" ");
            if text.trim().is_empty() {
                println!("{NOTHING_ADDED}");
                return Ok(());
            }
            add_task(cli.port, &text).await
        }
        Commands::List { status, query } => {
            list_tasks(cli.port, status.into(), query.as_deref().unwrap_or("")).await
        }
        Commands::Toggle { id } => toggle_task(cli.port, TaskId(id)).await,
        Commands::Clear => clear_completed(cli.port).await,
        Commands::Export { output } => export_tasks(cli.port, output.as_deref()).await,
        Commands::End => end_session(cli.port).await,
    }
}

/// Connect to (or start) the server and resolve the CLI's session.
///
/// A remembered session the server no longer knows about (e.g. after a
/// restart) is replaced by a fresh one.
async fn connect(port: u16) -> Result<(ApiClient, SessionId)> {
    let port = server::ensure_server_running(port)?;
    let client = ApiClient::local(port);
    let app_dir = config::app_dir()?;
    let session = resolve_session(&client, &app_dir).await?;
    Ok((client, session))
}

async fn resolve_session(client: &ApiClient, app_dir: &Path) -> Result<SessionId> {
    if let Some(session) = read_session_file(app_dir)? {
        if client.session_exists(session).await? {
            return Ok(session);
        }
        debug!(%session, "remembered session is gone, starting a new one");
    }

    let session = client.create_session().await?;
    write_session_file(app_dir, session)?;
    Ok(session)
}

async fn add_task(port: u16, text: &str) -> Result<()> {
    let (client, session) = connect(port).await?;

    match client.add_task(session, text).await? {
        Some(task) => println!("Added #{}: {}", task.id, task.text),
        None => println!("{NOTHING_ADDED}"),
    }
    Ok(())
}

async fn list_tasks(port: u16, status: StatusFilter, query: &str) -> Result<()> {
    let (client, session) = connect(port).await?;
    let board = client.board(session, status, query).await?;

    let s = board.summary;
    println!(
        "Pending: {} | Done: {} | Total: {}",
        s.pending, s.completed, s.total
    );

    if status != StatusFilter::Completed {
        println!();
        println!("PENDING");
        print_tasks(&board.pending);
    }
    if status != StatusFilter::Pending {
        println!();
        println!("COMPLETED");
        print_tasks(&board.completed);
    }
    Ok(())
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("  (none)");
        return;
    }
    for task in tasks {
        println!("  {}", format_task(task));
    }
}

fn format_task(task: &Task) -> String {
    let mark = if task.done { "x" } else { " " };
    format!(
        "[{mark}] {:>4}  {:<40}  {}",
        task.id,
        task.text,
        task.created_at.format("%Y-%m-%d %H:%M")
    )
}

async fn toggle_task(port: u16, id: TaskId) -> Result<()> {
    let (client, session) = connect(port).await?;

    match client.toggle_task(session, id).await? {
        Some(true) => println!("#{id} marked done."),
        Some(false) => println!("#{id} marked pending."),
        None => println!("No task #{id}."),
    }
    Ok(())
}

async fn clear_completed(port: u16) -> Result<()> {
    let (client, session) = connect(port).await?;
    let removed = client.clear_completed(session).await?;
    println!("Removed {removed} completed task(s).");
    Ok(())
}

async fn export_tasks(port: u16, output: Option<&str>) -> Result<()> {
    let (client, session) = connect(port).await?;
    let tasks = client.export(session).await?;
    let json = serde_json::to_string_pretty(&tasks).context("Failed to serialize tasks")?;

    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {path}"))?;
            println!("Exported {} task(s) to {path}.", tasks.len());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn end_session(port: u16) -> Result<()> {
    let app_dir = config::app_dir()?;
    let Some(session) = read_session_file(&app_dir)? else {
        println!("No active session.");
        return Ok(());
    };

    let client = ApiClient::local(server::get_server_port().unwrap_or(port));
    match client.end_session(session).await {
        Ok(true) => println!("Session ended."),
        Ok(false) => println!("Session had already expired."),
        Err(err) => debug!(error = %err, "could not reach server to end session"),
    }

    clear_session_file(&app_dir)
}
