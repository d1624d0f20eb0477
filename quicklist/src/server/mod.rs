//! QuickList server - serves the to-do page and a per-session task API.
//!
//! Architecture:
//! - One server process holds every session in memory (nothing is persisted)
//! - Each browser tab or CLI user owns a session and, through it, one task list
//! - The page and the CLI re-fetch the board after every mutation; there is
//!   no push channel
//!
//! Endpoints:
//! - GET / - The to-do page
//! - GET /api/health - Liveness, version and live session count
//! - POST /api/sessions - Start a session
//! - DELETE /api/sessions/:sid - End a session
//! - GET /api/sessions/:sid/tasks - Pending/completed board (status, q filters)
//! - POST /api/sessions/:sid/tasks - Add a task
//! - POST /api/sessions/:sid/tasks/:id/toggle - Toggle a task's done flag
//! - POST /api/sessions/:sid/tasks/clear-completed - Remove completed tasks
//! - GET /api/sessions/:sid/export - Download all tasks as JSON

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{self, ServerConfig};
use crate::error::{ApiError, ApiResult};
use crate::models::{StatusFilter, Task, TaskId, TaskSummary};
use crate::session::{SessionId, SessionStore};

const PID_FILE: &str = "server.pid";
const PORT_FILE: &str = "server.port";

/// Shared server state.
#[derive(Debug, Default)]
pub struct AppState {
    /// Every live session, keyed by id.
    sessions: RwLock<SessionStore>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

pub type SharedState = Arc<AppState>;

// === Request/Response Types ===

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: SessionId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddTaskRequest {
    pub text: String,
}

/// `task` is `null` when the text was blank and nothing was created.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddTaskResponse {
    pub task: Option<Task>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub id: TaskId,
    pub done: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub removed: usize,
}

/// Current view of a session's list.
///
/// `pending` and `completed` honour the request filters; `summary` always
/// counts the whole list.
#[derive(Debug, Serialize, Deserialize)]
pub struct Board {
    pub pending: Vec<Task>,
    pub completed: Vec<Task>,
    pub summary: TaskSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions: usize,
}

/// Query parameters for the board.
#[derive(Debug, Deserialize)]
pub struct BoardParams {
    pub status: Option<String>,
    pub q: Option<String>,
}

// === Server Lifecycle ===

/// Build the application router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{session_id}", delete(end_session))
        .route("/api/sessions/{session_id}/tasks", get(get_board))
        .route("/api/sessions/{session_id}/tasks", post(add_task))
        .route(
            "/api/sessions/{session_id}/tasks/clear-completed",
            post(clear_completed),
        )
        .route(
            "/api/sessions/{session_id}/tasks/{task_id}/toggle",
            post(toggle_task),
        )
        .route("/api/sessions/{session_id}/export", get(export_tasks))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server and run until Ctrl-C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let app_dir = config::app_dir()?;
    std::fs::create_dir_all(&app_dir)
        .with_context(|| format!("Failed to create directory: {}", app_dir.display()))?;

    let state = Arc::new(AppState::new());
    let sweeper = spawn_session_sweeper(
        Arc::clone(&state),
        config.sweep_interval,
        config.session_ttl,
    );

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;
    let addr = listener.local_addr()?;

    let pid_file = app_dir.join(PID_FILE);
    std::fs::write(&pid_file, std::process::id().to_string())
        .with_context(|| format!("Failed to write {}", pid_file.display()))?;
    let port_file = app_dir.join(PORT_FILE);
    std::fs::write(&port_file, addr.port().to_string())
        .with_context(|| format!("Failed to write {}", port_file.display()))?;

    info!(%addr, ttl_secs = config.session_ttl.as_secs(), "QuickList server listening");
    println!("QuickList running on http://{addr}");

    if config.open_browser {
        if let Err(err) = open::that(format!("http://{addr}")) {
            warn!(error = %err, "could not open browser");
        }
    }

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");

    sweeper.abort();
    let _ = std::fs::remove_file(app_dir.join(PID_FILE));
    let _ = std::fs::remove_file(app_dir.join(PORT_FILE));
    info!("QuickList server stopped");

    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Periodically discard sessions idle for longer than `ttl`.
fn spawn_session_sweeper(state: SharedState, every: Duration, ttl: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            state.sessions.write().await.evict_idle(Utc::now(), ttl);
        }
    })
}

fn get_app_dir() -> Option<PathBuf> {
    config::app_dir().ok()
}

/// Port of the running server, if its PID file names a live process.
pub fn get_server_port() -> Option<u16> {
    let app_dir = get_app_dir()?;
    let pid_file = app_dir.join(PID_FILE);
    let port_file = app_dir.join(PORT_FILE);

    let pid = std::fs::read_to_string(&pid_file)
        .ok()?
        .trim()
        .parse::<u32>()
        .ok()?;

    #[cfg(unix)]
    {
        use std::process::Command;
        let alive = Command::new("kill")
            .args(["-0", &pid.to_string()])
            .output()
            .is_ok_and(|o| o.status.success());
        if !alive {
            return None;
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    std::fs::read_to_string(&port_file).ok()?.trim().parse().ok()
}

/// Launch `quicklist serve` as a detached background process.
pub fn spawn_server_daemon(port: u16) -> Result<()> {
    use std::process::{Command, Stdio};

    let exe = std::env::current_exe()?;

    Command::new(&exe)
        .args(["serve", "--port", &port.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("Failed to spawn server daemon")?;

    std::thread::sleep(Duration::from_millis(500));
    Ok(())
}

/// Return the running server's port, starting one on `port` if needed.
pub fn ensure_server_running(port: u16) -> Result<u16> {
    if let Some(port) = get_server_port() {
        return Ok(port);
    }

    info!(port, "no running server found, starting one");
    spawn_server_daemon(port)?;

    for _ in 0..20 {
        if let Some(p) = get_server_port() {
            return Ok(p);
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    anyhow::bail!("Server failed to start")
}

// === Handlers ===

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("ui.html"))
}

async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: state.sessions.read().await.len(),
    })
}

fn parse_session_id(raw: &str) -> ApiResult<SessionId> {
    SessionId::parse(raw).ok_or_else(|| ApiError::SessionNotFound(raw.to_string()))
}

async fn create_session(
    State(state): State<SharedState>,
) -> (StatusCode, Json<SessionResponse>) {
    let session_id = state.sessions.write().await.create();
    (StatusCode::CREATED, Json(SessionResponse { session_id }))
}

async fn end_session(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_session_id(&session_id)?;
    if state.sessions.write().await.end(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(session_id))
    }
}

async fn get_board(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Query(params): Query<BoardParams>,
) -> ApiResult<Json<Board>> {
    let id = parse_session_id(&session_id)?;
    let filter = match params.status.as_deref() {
        None | Some("") => StatusFilter::All,
        Some(raw) => StatusFilter::from_str(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown status filter '{raw}'")))?,
    };
    let query = params.q.unwrap_or_default();

    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(&id)
        .ok_or(ApiError::SessionNotFound(session_id))?;

    let (completed, pending): (Vec<Task>, Vec<Task>) = session
        .tasks
        .view(filter, &query)
        .into_iter()
        .cloned()
        .partition(|t| t.done);

    Ok(Json(Board {
        pending,
        completed,
        summary: session.tasks.summary(),
    }))
}

async fn add_task(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    payload: Result<Json<AddTaskRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AddTaskResponse>)> {
    let Json(req) = payload?;
    let id = parse_session_id(&session_id)?;
    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(&id)
        .ok_or(ApiError::SessionNotFound(session_id))?;

    let task = session.tasks.add(&req.text).cloned();
    let status = if task.is_some() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(AddTaskResponse { task })))
}

async fn toggle_task(
    State(state): State<SharedState>,
    path: Result<Path<(String, u64)>, PathRejection>,
) -> ApiResult<Json<ToggleResponse>> {
    let Path((session_id, task_id)) = path?;
    let id = parse_session_id(&session_id)?;
    let task_id = TaskId(task_id);
    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(&id)
        .ok_or(ApiError::SessionNotFound(session_id))?;

    let done = session
        .tasks
        .toggle_done(task_id)
        .ok_or(ApiError::TaskNotFound(task_id))?;
    Ok(Json(ToggleResponse { id: task_id, done }))
}

async fn clear_completed(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<ClearResponse>> {
    let id = parse_session_id(&session_id)?;
    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(&id)
        .ok_or(ApiError::SessionNotFound(session_id))?;

    let removed = session.tasks.clear_completed();
    Ok(Json(ClearResponse { removed }))
}

async fn export_tasks(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_session_id(&session_id)?;
    let sessions = state.sessions.read().await;
    let session = sessions
        .get(&id)
        .ok_or(ApiError::SessionNotFound(session_id))?;

    let tasks: Vec<&Task> = session.tasks.iter().collect();
    let body = serde_json::to_string_pretty(&tasks).context("Failed to serialize tasks")?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"tasks.json\""),
        ],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ApiClient;

    async fn spawn_app() -> (ApiClient, SharedState) {
        let state = Arc::new(AppState::new());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::clone(&state));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (ApiClient::new(&format!("http://{addr}")), state)
    }

    #[tokio::test]
    async fn serves_page_and_health() {
        let (client, _) = spawn_app().await;

        let page = reqwest::get(client.base_url()).await.unwrap();
        assert_eq!(page.status(), StatusCode::OK);
        assert!(page.text().await.unwrap().contains("QuickList"));

        let health = client.health().await.unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.sessions, 0);
    }

    #[tokio::test]
    async fn buy_milk_scenario_over_http() {
        let (client, _) = spawn_app().await;
        let sid = client.create_session().await.unwrap();

        let milk = client.add_task(sid, "Buy milk").await.unwrap().unwrap();
        client.add_task(sid, "Write report").await.unwrap().unwrap();

        assert_eq!(client.toggle_task(sid, milk.id).await.unwrap(), Some(true));

        let board = client.board(sid, StatusFilter::All, "").await.unwrap();
        let pending: Vec<_> = board.pending.iter().map(|t| t.text.as_str()).collect();
        let completed: Vec<_> = board.completed.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(pending, vec!["Write report"]);
        assert_eq!(completed, vec!["Buy milk"]);
        assert_eq!(board.summary.total, 2);

        assert_eq!(client.clear_completed(sid).await.unwrap(), 1);
        let board = client.board(sid, StatusFilter::All, "").await.unwrap();
        assert_eq!(board.pending.len(), 1);
        assert_eq!(board.pending[0].text, "Write report");
        assert!(!board.pending[0].done);
        assert!(board.completed.is_empty());
    }

    #[tokio::test]
    async fn blank_text_creates_nothing() {
        let (client, _) = spawn_app().await;
        let sid = client.create_session().await.unwrap();

        assert!(client.add_task(sid, "   ").await.unwrap().is_none());
        let board = client.board(sid, StatusFilter::All, "").await.unwrap();
        assert_eq!(board.summary.total, 0);
    }

    #[tokio::test]
    async fn toggle_unknown_task_is_not_found() {
        let (client, _) = spawn_app().await;
        let sid = client.create_session().await.unwrap();

        assert_eq!(client.toggle_task(sid, TaskId(42)).await.unwrap(), None);

        let url = format!("{}/api/sessions/{sid}/tasks/42/toggle", client.base_url());
        let resp = reqwest::Client::new().post(url).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["type"], "task_not_found");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (client, _) = spawn_app().await;
        let stranger = SessionId::generate();

        assert!(!client.session_exists(stranger).await.unwrap());

        let url = format!("{}/api/sessions/not-a-session/tasks", client.base_url());
        let resp = reqwest::get(url).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["type"], "session_not_found");
    }

    #[tokio::test]
    async fn sessions_do_not_share_tasks() {
        let (client, state) = spawn_app().await;
        let a = client.create_session().await.unwrap();
        let b = client.create_session().await.unwrap();

        client.add_task(a, "only in a").await.unwrap();

        let board_b = client.board(b, StatusFilter::All, "").await.unwrap();
        assert_eq!(board_b.summary.total, 0);
        assert_eq!(state.sessions.read().await.len(), 2);
    }

    #[tokio::test]
    async fn board_applies_status_and_query() {
        let (client, _) = spawn_app().await;
        let sid = client.create_session().await.unwrap();
        let milk = client.add_task(sid, "Buy milk").await.unwrap().unwrap();
        client.add_task(sid, "Buy bread").await.unwrap();
        client.add_task(sid, "Write report").await.unwrap();
        client.toggle_task(sid, milk.id).await.unwrap();

        let board = client.board(sid, StatusFilter::Pending, "buy").await.unwrap();
        assert_eq!(board.pending.len(), 1);
        assert_eq!(board.pending[0].text, "Buy bread");
        assert!(board.completed.is_empty());
        assert_eq!(board.summary.total, 3);

        let url = format!("{}/api/sessions/{sid}/tasks?status=overdue", client.base_url());
        let resp = reqwest::get(url).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn export_returns_every_task() {
        let (client, _) = spawn_app().await;
        let sid = client.create_session().await.unwrap();
        let first = client.add_task(sid, "one").await.unwrap().unwrap();
        client.add_task(sid, "two").await.unwrap();
        client.toggle_task(sid, first.id).await.unwrap();

        let tasks = client.export(sid).await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, first.id);
        assert!(tasks[0].done);
        assert_eq!(tasks[1].text, "two");
    }

    #[tokio::test]
    async fn malformed_requests_get_json_errors() {
        let (client, _) = spawn_app().await;
        let sid = client.create_session().await.unwrap();
        let http = reqwest::Client::new();

        let resp = http
            .post(format!("{}/api/sessions/{sid}/tasks", client.base_url()))
            .json(&serde_json::json!({ "title": "wrong field" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["type"], "bad_request");

        let resp = http
            .post(format!("{}/api/sessions/{sid}/tasks/abc/toggle", client.base_url()))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["type"], "bad_request");
    }

    #[tokio::test]
    async fn ended_session_is_gone() {
        let (client, state) = spawn_app().await;
        let sid = client.create_session().await.unwrap();

        assert!(client.end_session(sid).await.unwrap());
        assert!(!client.end_session(sid).await.unwrap());
        assert!(state.sessions.read().await.is_empty());
    }

    #[tokio::test]
    async fn sweeper_evicts_idle_sessions() {
        let state = Arc::new(AppState::new());
        state.sessions.write().await.create();

        let sweeper = spawn_session_sweeper(
            Arc::clone(&state),
            Duration::from_millis(20),
            Duration::ZERO,
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        sweeper.abort();

        assert!(state.sessions.read().await.is_empty());
    }
}
