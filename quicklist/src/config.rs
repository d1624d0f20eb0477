//! Server configuration and runtime file locations.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Runtime directory under the user's home (PID/port files, CLI session).
pub const APP_DIR: &str = ".quicklist";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8501;
/// Idle sessions are discarded after this many seconds.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60;

const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Get the runtime directory, `~/.quicklist`.
pub fn app_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(APP_DIR))
}

/// Validated settings for `quicklist serve`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind.
    pub addr: SocketAddr,
    /// Idle time after which a session is evicted.
    pub session_ttl: Duration,
    /// How often idle sessions are swept.
    pub sweep_interval: Duration,
    /// Open the page in a browser once listening.
    pub open_browser: bool,
}

impl ServerConfig {
    /// Build a config from raw CLI/env values.
    pub fn new(host: &str, port: u16, session_ttl_secs: u64, open_browser: bool) -> Result<Self> {
        let ip: IpAddr = host
            .trim()
            .parse()
            .with_context(|| format!("Invalid host address: {host}"))?;

        if session_ttl_secs == 0 {
            bail!("Session TTL must be at least one second");
        }
        let session_ttl = Duration::from_secs(session_ttl_secs);
        let sweep_interval = (session_ttl / 2).clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL);

        Ok(Self {
            addr: SocketAddr::new(ip, port),
            session_ttl,
            sweep_interval,
            open_browser,
        })
    }

    /// URL of the page served by this config.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            sweep_interval: MAX_SWEEP_INTERVAL,
            open_browser: false,
        }
    }
}
