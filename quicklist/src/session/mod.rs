//! Session ownership of task lists.

mod file;
mod store;

pub use file::{clear_session_file, read_session_file, write_session_file};
pub use store::{Session, SessionId, SessionStore};
