//! Retry rounds
//!
//! After a failed first round, failed tasks are reset in place and
//! redispatched alone, one round per remaining retry, until a round comes
//! back clean or the retries run out.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::runner::TestRunner;
use crate::models::{RunStatus, RunSummary, Task};

/// Remaining retry budget for a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetrySession {
    remaining: u32,
}

impl RetrySession {
    pub fn new(retries: u32) -> Self {
        Self { remaining: retries }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    fn consume(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}

/// Tasks of a finished round that carry an error, read from task state
pub fn select_failed(tasks: &[Arc<Task>]) -> Vec<Arc<Task>> {
    tasks.iter().filter(|t| t.has_error()).cloned().collect()
}

pub struct RetryController {
    session: RetrySession,
}

impl RetryController {
    pub fn new(retries: u32) -> Self {
        Self {
            session: RetrySession::new(retries),
        }
    }

    /// Drive retry rounds after a failed round. `tasks` is the batch of the
    /// last round; only its tasks carrying an error are redispatched.
    pub async fn run(
        mut self,
        runner: &mut TestRunner,
        tasks: &[Arc<Task>],
        summary: &mut RunSummary,
    ) -> RunStatus {
        let mut pending = select_failed(tasks);
        let mut round = summary.rounds.len() as u32;

        while !self.session.is_exhausted() {
            warn!(">>> Remaining retries: {}", self.session.remaining());

            for task in &pending {
                task.reset();
            }
            round += 1;
            info!(">>> Retrying {} failed tasks (round {})", pending.len(), round);

            let report = runner.run_round(round, &pending).await;
            let success = report.is_success();
            summary.push_round(report);

            if success {
                return RunStatus::Passed;
            }

            self.session.consume();
            pending = select_failed(&pending);
        }

        error!("Still errors after retries. Exiting...");
        RunStatus::RetryExhausted
    }
}
