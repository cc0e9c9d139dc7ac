//! Report models
//!
//! `RoundReport` is what the reporter produces for one round. `RunSummary`
//! collects every round of a run for final output only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::task::Task;

/// Snapshot of one task at report time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: usize,
    pub capability: String,
    pub suite: String,
    pub test: String,
    pub attempts: u32,
    pub error: Option<String>,
}

impl TaskRecord {
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id(),
            capability: task.capability().to_string(),
            suite: task.suite().to_string(),
            test: task.name().to_string(),
            attempts: task.attempts(),
            error: task.error(),
        }
    }
}

impl fmt::Display for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} > {}", self.capability, self.suite, self.test)?;
        if let Some(err) = &self.error {
            write!(f, " - {err}")?;
        }
        Ok(())
    }
}

/// Outcome of one dispatch-and-await round
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: u32,
    pub total: usize,
    pub ok: usize,
    /// Errored tasks in dispatch order
    pub errored: Vec<TaskRecord>,
    pub duration_ms: u64,
}

impl RoundReport {
    pub fn error_count(&self) -> usize {
        self.errored.len()
    }

    pub fn is_success(&self) -> bool {
        self.errored.is_empty()
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.ok as f64 / self.total as f64) * 100.0
        }
    }
}

impl fmt::Display for RoundReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Round {}: {}/{} ok, {} errored ({}ms)",
            self.round,
            self.ok,
            self.total,
            self.error_count(),
            self.duration_ms
        )?;
        for record in &self.errored {
            writeln!(f, "  ✗ {record}")?;
        }
        Ok(())
    }
}

/// Terminal status of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Passed,
    /// Errors remained and retries were disabled
    Failed,
    /// Errors remained after every configured retry
    RetryExhausted,
}

impl RunStatus {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Passed => 0,
            RunStatus::Failed | RunStatus::RetryExhausted => 1,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Passed => write!(f, "PASSED"),
            RunStatus::Failed => write!(f, "FAILED"),
            RunStatus::RetryExhausted => write!(f, "FAILED (retries exhausted)"),
        }
    }
}

/// Every round of a run, plus its terminal status
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub total_tasks: usize,
    pub rounds: Vec<RoundReport>,
    pub status: RunStatus,
}

impl RunSummary {
    pub fn new(total_tasks: usize) -> Self {
        Self {
            started_at: Utc::now(),
            total_tasks,
            rounds: Vec::new(),
            status: RunStatus::Passed,
        }
    }

    pub fn push_round(&mut self, report: RoundReport) {
        self.rounds.push(report);
    }

    pub fn last_round(&self) -> Option<&RoundReport> {
        self.rounds.last()
    }

    /// Retry rounds only (the initial round excluded)
    pub fn retry_rounds(&self) -> usize {
        self.rounds.len().saturating_sub(1)
    }

    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskOutcome;

    fn record(id: usize, error: Option<&str>) -> TaskRecord {
        TaskRecord {
            id,
            capability: "chrome".to_string(),
            suite: "Home".to_string(),
            test: format!("test {id}"),
            attempts: 1,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_record_from_task() {
        let task = Task::new("chrome", "Home", "renders").with_id(3);
        task.mark_dispatched().unwrap();
        task.mark_running();
        task.complete(TaskOutcome::Error("timeout".to_string()));

        let record = TaskRecord::from_task(&task);
        assert_eq!(record.id, 3);
        assert_eq!(record.attempts, 1);
        assert_eq!(record.to_string(), "[chrome] Home > renders - timeout");
    }

    #[test]
    fn test_round_report() {
        let report = RoundReport {
            round: 1,
            total: 4,
            ok: 3,
            errored: vec![record(2, Some("boom"))],
            duration_ms: 10,
        };
        assert!(!report.is_success());
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.pass_rate(), 75.0);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunStatus::Passed.exit_code(), 0);
        assert_eq!(RunStatus::Failed.exit_code(), 1);
        assert_eq!(RunStatus::RetryExhausted.exit_code(), 1);
    }

    #[test]
    fn test_summary_retry_rounds() {
        let mut summary = RunSummary::new(2);
        assert_eq!(summary.retry_rounds(), 0);
        for round in 1..=3 {
            summary.push_round(RoundReport {
                round,
                total: 2,
                ok: 2,
                errored: Vec::new(),
                duration_ms: 0,
            });
        }
        assert_eq!(summary.retry_rounds(), 2);
        assert_eq!(summary.last_round().map(|r| r.round), Some(3));
    }
}
