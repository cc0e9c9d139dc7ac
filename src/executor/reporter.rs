//! Round reporter
//!
//! Holds the outcomes of the current round only. Its final report is the
//! single input to the retry decision.

use std::sync::Arc;
use tracing::{error, info};

use crate::models::{RoundReport, Task, TaskOutcome, TaskRecord};

#[derive(Default)]
pub struct Reporter {
    /// Outcomes in dispatch order
    outcomes: Vec<(Arc<Task>, TaskOutcome)>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved task. Call in dispatch order.
    pub fn record(&mut self, task: &Arc<Task>, outcome: TaskOutcome) {
        self.outcomes.push((Arc::clone(task), outcome));
    }

    pub fn final_report(&self, round: u32, duration_ms: u64) -> RoundReport {
        let errored: Vec<TaskRecord> = self
            .outcomes
            .iter()
            .filter_map(|(task, outcome)| {
                outcome.error().map(|e| {
                    let mut record = TaskRecord::from_task(task);
                    record.error = Some(e.to_string());
                    record
                })
            })
            .collect();

        let report = RoundReport {
            round,
            total: self.outcomes.len(),
            ok: self.outcomes.len() - errored.len(),
            errored,
            duration_ms,
        };

        if report.is_success() {
            info!(
                ">>> Round {}: all {} tasks passed ({}ms)",
                round, report.total, duration_ms
            );
        } else {
            error!(
                ">>> Round {}: {}/{} tasks errored ({}ms)",
                round,
                report.error_count(),
                report.total,
                duration_ms
            );
            for record in &report.errored {
                error!("    {}", record);
            }
        }

        report
    }

    /// Drop this round's outcomes; tasks and pools are untouched
    pub fn reset(&mut self) {
        self.outcomes.clear();
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
