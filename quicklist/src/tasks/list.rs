//! Ordered, in-memory task list owned by a single session.
//!
//! Insertion order is display order. A task is created by [`TaskList::add`],
//! mutated only by [`TaskList::toggle_done`], and removed only by
//! [`TaskList::clear_completed`]. Every read is recomputed from the current
//! sequence; nothing is cached between calls.

use tracing::debug;

use crate::models::{StatusFilter, Task, TaskId, TaskSummary};

/// Task list for one session.
#[derive(Debug, Default)]
pub struct TaskList {
    tasks: Vec<Task>,
    /// Last id handed out. Only ever grows.
    last_id: u64,
}

impl TaskList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task with the trimmed `text`.
    ///
    /// Returns `None` and leaves the list untouched when the trimmed text is
    /// empty.
    pub fn add(&mut self, text: &str) -> Option<&Task> {
        let text = text.trim();
        if text.is_empty() {
            debug!("rejected empty task text");
            return None;
        }

        self.last_id += 1;
        let task = Task::new(TaskId(self.last_id), text.to_string());
        debug!(id = %task.id, "task added");
        self.tasks.push(task);
        self.tasks.last()
    }

    /// Flip the `done` flag of the task with `id`.
    ///
    /// Returns the new value, or `None` if no such task exists.
    pub fn toggle_done(&mut self, id: TaskId) -> Option<bool> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(%id, "toggle on unknown task");
            return None;
        };
        task.done = !task.done;
        debug!(%id, done = task.done, "task toggled");
        Some(task.done)
    }

    /// Remove every completed task, keeping the rest in order.
    ///
    /// Returns how many tasks were removed.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.done);
        let removed = before - self.tasks.len();
        debug!(removed, "cleared completed tasks");
        removed
    }

    /// Tasks not yet done, in insertion order.
    pub fn pending(&self) -> impl Iterator<Item = &Task> + Clone + '_ {
        self.tasks.iter().filter(|t| !t.done)
    }

    /// Tasks marked done, in insertion order.
    pub fn completed(&self) -> impl Iterator<Item = &Task> + Clone + '_ {
        self.tasks.iter().filter(|t| t.done)
    }

    /// Look up a task by id.
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// All tasks in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Pending/completed/total counts.
    pub fn summary(&self) -> TaskSummary {
        let completed = self.completed().count();
        TaskSummary {
            pending: self.tasks.len() - completed,
            completed,
            total: self.tasks.len(),
        }
    }

    /// Tasks passing `filter` whose text contains `query`, ignoring case.
    ///
    /// A blank query matches every task.
    pub fn view(&self, filter: StatusFilter, query: &str) -> Vec<&Task> {
        let needle = query.trim().to_lowercase();
        self.tasks
            .iter()
            .filter(|t| filter.matches(t.done))
            .filter(|t| needle.is_empty() || t.text.to_lowercase().contains(&needle))
            .collect()
    }
}

impl<'a> IntoIterator for &'a TaskList {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
