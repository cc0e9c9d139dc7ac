//! Capability pools
//!
//! One bounded pool per capability. A task dispatched into a full pool waits
//! in a FIFO queue and is started when a running task of the same pool
//! completes. The active count and the queue are only touched under the
//! pool's lock, and only in response to a dispatch or a completion.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::launcher::Launcher;
use crate::error::{DispatchError, LaunchError};
use crate::models::{Capability, Task, TaskOutcome};

/// Point-in-time view of one pool
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolStats {
    pub capability: String,
    pub capacity: usize,
    pub active: usize,
    pub queued: usize,
    /// Highest active count observed so far
    pub high_water: usize,
}

#[derive(Default)]
struct PoolState {
    active: usize,
    queue: VecDeque<Arc<Task>>,
    high_water: usize,
}

struct Pool {
    capability: Arc<Capability>,
    launcher: Arc<dyn Launcher>,
    task_timeout: Option<Duration>,
    state: Mutex<PoolState>,
}

impl Pool {
    fn capacity(&self) -> usize {
        self.capability.concurrency
    }

    fn submit(self: &Arc<Self>, task: Arc<Task>) {
        let start_now = {
            let mut state = self.state.lock();
            if state.active < self.capacity() {
                state.active += 1;
                state.high_water = state.high_water.max(state.active);
                true
            } else {
                debug!("{} queued ({} waiting)", task, state.queue.len() + 1);
                state.queue.push_back(Arc::clone(&task));
                false
            }
        };

        if start_now {
            self.start(task);
        }
    }

    fn start(self: &Arc<Self>, task: Arc<Task>) {
        task.mark_running();
        debug!("{} running (attempt {})", task, task.attempts());

        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let started = Instant::now();
            let outcome = pool.execute(&task).await;
            match &outcome {
                TaskOutcome::Ok => debug!("{} ok [{}ms]", task, started.elapsed().as_millis()),
                TaskOutcome::Error(e) => warn!("{} errored: {}", task, e),
            }
            task.complete(outcome);
            pool.release();
        });
    }

    /// Run the launcher in its own task so a panic becomes a task error
    async fn execute(&self, task: &Arc<Task>) -> TaskOutcome {
        let launcher = Arc::clone(&self.launcher);
        let capability = Arc::clone(&self.capability);
        let task = Arc::clone(task);
        let timeout = self.task_timeout;

        let handle = tokio::spawn(async move {
            let launch = launcher.launch(&capability, &task);
            match timeout {
                Some(limit) => tokio::time::timeout(limit, launch)
                    .await
                    .unwrap_or(Err(LaunchError::TimedOut(limit.as_secs()))),
                None => launch.await,
            }
        });

        match handle.await {
            Ok(Ok(())) => TaskOutcome::Ok,
            Ok(Err(e)) => TaskOutcome::Error(e.to_string()),
            Err(e) => TaskOutcome::Error(format!("launcher aborted: {e}")),
        }
    }

    /// Hand the freed slot to the next queued task, or give it back
    fn release(self: &Arc<Self>) {
        let next = {
            let mut state = self.state.lock();
            let next = state.queue.pop_front();
            if next.is_none() {
                state.active -= 1;
            }
            next
        };

        if let Some(task) = next {
            self.start(task);
        }
    }

    fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            capability: self.capability.name.clone(),
            capacity: self.capacity(),
            active: state.active,
            queued: state.queue.len(),
            high_water: state.high_water,
        }
    }
}

/// Dispatches tasks into their capability's pool
pub struct PoolManager {
    pools: HashMap<String, Arc<Pool>>,
}

impl PoolManager {
    /// One pool per capability, sized by its concurrency
    #[cfg(test)]
    pub fn new(capabilities: &[Capability], launcher: Arc<dyn Launcher>) -> Self {
        Self::with_task_timeout(capabilities, launcher, None)
    }

    pub fn with_task_timeout(
        capabilities: &[Capability],
        launcher: Arc<dyn Launcher>,
        task_timeout: Option<Duration>,
    ) -> Self {
        let pools = capabilities
            .iter()
            .map(|cap| {
                let pool = Pool {
                    capability: Arc::new(cap.clone()),
                    launcher: Arc::clone(&launcher),
                    task_timeout,
                    state: Mutex::new(PoolState::default()),
                };
                (cap.name.clone(), Arc::new(pool))
            })
            .collect();
        Self { pools }
    }

    /// Start the task now if its pool has a free slot, otherwise queue it.
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, task: Arc<Task>) -> Result<(), DispatchError> {
        let pool = self
            .pools
            .get(task.capability())
            .ok_or_else(|| DispatchError::NoPool(task.capability().to_string()))?;
        task.mark_dispatched()?;
        pool.submit(task);
        Ok(())
    }

    #[cfg(test)]
    pub fn stats(&self, capability: &str) -> Option<PoolStats> {
        self.pools.get(capability).map(|pool| pool.stats())
    }

    pub fn all_stats(&self) -> Vec<PoolStats> {
        let mut stats: Vec<_> = self.pools.values().map(|pool| pool.stats()).collect();
        stats.sort_by(|a, b| a.capability.cmp(&b.capability));
        stats
    }
}
