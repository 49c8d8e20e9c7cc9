//! Runtime configuration, resolved once at startup.

use anyhow::{Context as _, Result};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::listener::trigger_port;

/// Everything the reactor needs to start a session.
#[derive(Debug, Clone)]
pub struct Config {
    /// Program to run inside the pty, resolved through `PATH`.
    pub program: String,
    pub args: Vec<String>,
    /// Root of `scripts/` and `passwords/`.
    pub config_dir: PathBuf,
    /// Transcript file, if logging is enabled.
    pub log: Option<PathBuf>,
    /// Trigger socket address, if remote triggers are enabled.
    pub trigger: Option<SocketAddr>,
}

/// `$HOME/.config/zcra`
pub fn default_config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Cannot determine the home directory")?;
    Ok(home.join(".config").join("zcra"))
}

/// Socket address for instance `id` on `bind`, or `None` when `id` pushes the
/// port past 65535.
pub fn trigger_addr(bind: IpAddr, id: u16) -> Option<SocketAddr> {
    trigger_port(id).map(|port| SocketAddr::new(bind, port))
}
