//! HTTP client for server communication.

use anyhow::{bail, Context, Result};
use reqwest::{Response, StatusCode};

use crate::models::{StatusFilter, Task, TaskId};
use crate::server::{
    AddTaskRequest, AddTaskResponse, Board, ClearResponse, HealthResponse, SessionResponse,
    ToggleResponse,
};
use crate::session::SessionId;

/// Thin typed wrapper over the server's JSON API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Client for a server on the loopback interface.
    pub fn local(port: u16) -> Self {
        Self::new(&format!("http://127.0.0.1:{port}"))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn session_url(&self, session: SessionId, rest: &str) -> String {
        format!("{}/api/sessions/{session}{rest}", self.base_url)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self
            .http
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
            .context("Failed to reach server")?;
        ensure_success(resp)
            .await?
            .json()
            .await
            .context("Failed to parse health response")
    }

    pub async fn create_session(&self) -> Result<SessionId> {
        let resp = self
            .http
            .post(format!("{}/api/sessions", self.base_url))
            .send()
            .await
            .context("Failed to create session on server")?;
        let created: SessionResponse = ensure_success(resp)
            .await?
            .json()
            .await
            .context("Failed to parse session response")?;
        Ok(created.session_id)
    }

    /// Whether the server still knows `session`.
    pub async fn session_exists(&self, session: SessionId) -> Result<bool> {
        let resp = self
            .http
            .get(self.session_url(session, "/tasks"))
            .send()
            .await
            .context("Failed to reach server")?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(resp).await?;
        Ok(true)
    }

    /// End `session`. Returns `false` if the server did not know it.
    pub async fn end_session(&self, session: SessionId) -> Result<bool> {
        let resp = self
            .http
            .delete(self.session_url(session, ""))
            .send()
            .await
            .context("Failed to end session on server")?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(resp).await?;
        Ok(true)
    }

    pub async fn board(&self, session: SessionId, status: StatusFilter, query: &str) -> Result<Board> {
        let url = format!(
            "{}?status={}&q={}",
            self.session_url(session, "/tasks"),
            status.as_str(),
            urlencoding::encode(query)
        );
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to get tasks from server")?;
        ensure_success(resp)
            .await?
            .json()
            .await
            .context("Failed to parse tasks")
    }

    /// Add a task. `None` means the server created nothing (blank text).
    pub async fn add_task(&self, session: SessionId, text: &str) -> Result<Option<Task>> {
        let resp = self
            .http
            .post(self.session_url(session, "/tasks"))
            .json(&AddTaskRequest {
                text: text.to_string(),
            })
            .send()
            .await
            .context("Failed to add task on server")?;
        let added: AddTaskResponse = ensure_success(resp)
            .await?
            .json()
            .await
            .context("Failed to parse response")?;
        Ok(added.task)
    }

    /// Toggle a task. `None` means the task does not exist.
    pub async fn toggle_task(&self, session: SessionId, id: TaskId) -> Result<Option<bool>> {
        let resp = self
            .http
            .post(self.session_url(session, &format!("/tasks/{id}/toggle")))
            .send()
            .await
            .context("Failed to toggle task on server")?;
        if resp.status() == StatusCode::NOT_FOUND {
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            if body["error"]["type"] == "task_not_found" {
                return Ok(None);
            }
            bail!("Session {session} not found");
        }
        let toggled: ToggleResponse = ensure_success(resp)
            .await?
            .json()
            .await
            .context("Failed to parse response")?;
        Ok(Some(toggled.done))
    }

    pub async fn clear_completed(&self, session: SessionId) -> Result<usize> {
        let resp = self
            .http
            .post(self.session_url(session, "/tasks/clear-completed"))
            .send()
            .await
            .context("Failed to clear tasks on server")?;
        let cleared: ClearResponse = ensure_success(resp)
            .await?
            .json()
            .await
            .context("Failed to parse response")?;
        Ok(cleared.removed)
    }

    pub async fn export(&self, session: SessionId) -> Result<Vec<Task>> {
        let resp = self
            .http
            .get(self.session_url(session, "/export"))
            .send()
            .await
            .context("Failed to export tasks from server")?;
        ensure_success(resp)
            .await?
            .json()
            .await
            .context("Failed to parse exported tasks")
    }
}

async fn ensure_success(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body: serde_json::Value = resp.json().await.unwrap_or_default();
    match body["error"]["message"].as_str() {
        Some(message) => bail!("Server returned {status}: {message}"),
        None => bail!("Server returned {status}"),
    }
}
