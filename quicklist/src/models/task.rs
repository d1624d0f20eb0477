//! Task model representing a single to-do item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session-unique task identifier.
///
/// Ids are handed out in increasing order and never reused, so a stale id
/// held by the UI can only ever miss, never hit a different task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Completion state of a task, used to select a view of the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    /// Tasks not yet done.
    Pending,
    /// Tasks marked done.
    Completed,
    /// Every task.
    #[default]
    All,
}

impl StatusFilter {
    /// Convert filter to its query-string form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::All => "all",
        }
    }

    /// Parse filter from a query-string value.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" | "open" | "todo" => Some(Self::Pending),
            "completed" | "done" => Some(Self::Completed),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    /// Whether a task with the given completion flag passes this filter.
    pub const fn matches(self, done: bool) -> bool {
        match self {
            Self::Pending => !done,
            Self::Completed => done,
            Self::All => true,
        }
    }
}

impl std::fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier unique within the owning session.
    pub id: TaskId,
    /// Trimmed, non-empty task text.
    pub text: String,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// Whether the task has been completed.
    pub done: bool,
}

impl Task {
    /// Create a new pending task stamped with the current time.
    pub fn new(id: TaskId, text: String) -> Self {
        Self {
            id,
            text,
            created_at: Utc::now(),
            done: false,
        }
    }
}

/// Counts over a task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub pending: usize,
    pub completed: usize,
    pub total: usize,
}
