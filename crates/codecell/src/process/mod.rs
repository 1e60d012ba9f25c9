//! Child process management
//!
//! Builds commands for interpreters and compilers, runs them under a wall
//! clock deadline, owns the per-request working directory and bounds how
//! many requests may spawn children at once.

use thiserror::Error;

pub use crate::process::command::ProcessCommand;
pub use crate::process::pool::{SpawnPermit, SpawnPool};
pub use crate::process::spawn::{ProcessOutput, run_with_deadline};
pub use crate::process::workspace::Workspace;

mod command;
mod pool;
mod spawn;
mod workspace;

/// Errors that occur while preparing or running child processes
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("child {0} pipe was not captured")]
    PipeUnavailable(&'static str),

    #[error("failed to create working directory: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("failed to remove working directory {path}: {source}")]
    CleanupFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("spawn pool is closed")]
    PoolClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
