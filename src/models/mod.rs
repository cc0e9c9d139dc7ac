//! Data models for test orchestration
//!
//! This module contains the capability, task and report structures shared
//! by the registry, the pools and the reporter.

mod capability;
mod report;
mod task;

pub use capability::Capability;
pub use report::{RoundReport, RunStatus, RunSummary, TaskRecord};
pub use task::{Task, TaskOutcome};

#[cfg(test)]
pub use task::TaskState;
