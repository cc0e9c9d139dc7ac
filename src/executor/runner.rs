//! Round-based test runner
//!
//! A round dispatches a batch of tasks, waits on every completion signal of
//! the batch, then asks the reporter for a verdict. The first round covers
//! all tasks; retry rounds are driven by [`RetryController`].

use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info};

use super::pool::PoolManager;
use super::reporter::Reporter;
use super::retry::RetryController;
use crate::models::{RoundReport, RunStatus, RunSummary, Task, TaskOutcome};
use crate::utils::Timer;

pub struct TestRunner {
    pools: PoolManager,
    reporter: Reporter,
    retries: u32,
}

impl TestRunner {
    pub fn new(pools: PoolManager, retries: u32) -> Self {
        Self {
            pools,
            reporter: Reporter::new(),
            retries,
        }
    }

    pub fn pools(&self) -> &PoolManager {
        &self.pools
    }

    /// Dispatch `tasks`, wait for all of them, and report the round
    pub async fn run_round(&mut self, round: u32, tasks: &[Arc<Task>]) -> RoundReport {
        let timer = Timer::start(format!("round {round}"));
        self.reporter.reset();

        let signals: Vec<_> = tasks.iter().map(|t| t.completion()).collect();
        for task in tasks {
            if let Err(e) = self.pools.dispatch(Arc::clone(task)) {
                error!("Cannot dispatch {}: {}", task, e);
                task.complete(TaskOutcome::Error(e.to_string()));
            }
        }

        let outcomes = join_all(signals.into_iter().map(|s| s.wait())).await;
        for (task, outcome) in tasks.iter().zip(outcomes) {
            self.reporter.record(task, outcome);
        }

        self.reporter.final_report(round, timer.stop())
    }

    /// Run the initial round and, if needed and allowed, the retry rounds
    pub async fn run(&mut self, tasks: &[Arc<Task>]) -> RunSummary {
        let mut summary = RunSummary::new(tasks.len());
        info!(">>> Running {} tasks...", tasks.len());

        let first = self.run_round(1, tasks).await;
        let clean = first.is_success();
        summary.push_round(first);

        let status = if clean {
            RunStatus::Passed
        } else if self.retries == 0 {
            RunStatus::Failed
        } else {
            RetryController::new(self.retries)
                .run(self, tasks, &mut summary)
                .await
        };
        summary.status = status;

        info!(
            ">>> Run {} after {} round(s)",
            summary.status,
            summary.rounds.len()
        );
        summary
    }
}
