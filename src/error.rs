//! Typed errors for the recoverable conditions the relay reports and keeps running through.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to resolve or read a script or password file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The name contains a path separator, a parent-directory token, or is empty.
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// The file is readable or writable by group or others.
    #[error("{} is accessible by group or others (mode {mode:o})", .path.display())]
    Insecure { path: PathBuf, mode: u32 },

    /// The file could not be inspected or read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a single interpreter operation.
///
/// None of these end the relay: the caller reports them and carries on.
#[derive(Debug, Error)]
pub enum InterpreterError {
    /// A script is already suspended on a wait.
    #[error("script {0:?} is still waiting, load rejected")]
    Busy(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
