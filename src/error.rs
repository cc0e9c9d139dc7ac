//! Error types
//!
//! Startup errors abort the run before any dispatch. Task failures are not
//! errors at this level: they are recorded as data on the task itself.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal startup errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Capability {0} is not registered in the configuration")]
    UnknownCapability(String),

    #[error("File {} does not exist", .0.display())]
    MissingSpecFile(PathBuf),

    #[error("Failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Process reaping errors (logged, never fatal)
#[derive(Error, Debug)]
pub enum ReapError {
    #[error("Failed to enumerate processes: {0}")]
    Enumerate(String),

    #[error("Failed to kill process {pid}: {reason}")]
    Kill { pid: u32, reason: String },

    #[error("Failed to adopt orphaned processes: {0}")]
    Adopt(String),
}

/// Per-task launch failures, recorded on the task as its error
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Task has no command to run")]
    MissingCommand,

    #[error("Failed to spawn command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Command exited with {status}: {detail}")]
    Failed { status: String, detail: String },

    #[error("Timed out after {0} seconds")]
    TimedOut(u64),

    #[cfg(test)]
    #[error("{0}")]
    Other(String),
}

/// Errors raised by the pool manager
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DispatchError {
    #[error("No pool registered for capability {0}")]
    NoPool(String),

    #[error("Task {id} is {state} and cannot be dispatched")]
    NotDispatchable { id: usize, state: String },
}
