//! Data models for quicklist entities.

mod task;

pub use task::{StatusFilter, Task, TaskId, TaskSummary};
