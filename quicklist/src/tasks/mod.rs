//! Task list management.

mod list;

pub use list::TaskList;
