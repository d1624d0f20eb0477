//! The CLI's remembered session id.
//!
//! The CLI is stateless between invocations, so the id of the session it
//! drives on the server is kept in a small file under the app directory.

use anyhow::{Context, Result};
use std::path::Path;

use super::SessionId;

const SESSION_FILE: &str = "cli.session";

/// Read the remembered session id from `dir`.
///
/// A missing, empty or unparsable file yields `None`.
pub fn read_session_file(dir: &Path) -> Result<Option<SessionId>> {
    let path = dir.join(SESSION_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    Ok(SessionId::parse(&content))
}

/// Remember `id` as the CLI's current session.
pub fn write_session_file(dir: &Path, id: SessionId) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    let path = dir.join(SESSION_FILE);
    std::fs::write(&path, id.to_string())
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Forget the remembered session, if any.
pub fn clear_session_file(dir: &Path) -> Result<()> {
    let path = dir.join(SESSION_FILE);
    if path.exists() {
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}
