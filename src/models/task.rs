//! Task model
//!
//! A task is one test case bound to a capability. Its identity survives
//! retry rounds: a retry resets the same task instead of creating a new one.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

use crate::error::DispatchError;

/// Lifecycle state of a task within one round
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Created,
    Dispatched,
    Running,
    Completed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Created => write!(f, "created"),
            TaskState::Dispatched => write!(f, "dispatched"),
            TaskState::Running => write!(f, "running"),
            TaskState::Completed => write!(f, "completed"),
        }
    }
}

/// Resolved value of a completion signal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "error")]
pub enum TaskOutcome {
    Ok,
    Error(String),
}

impl TaskOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, TaskOutcome::Ok)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TaskOutcome::Ok => None,
            TaskOutcome::Error(e) => Some(e),
        }
    }
}

struct TaskInner {
    state: TaskState,
    error: Option<String>,
    attempts: u32,
    signal: watch::Sender<Option<TaskOutcome>>,
}

/// A schedulable test case
pub struct Task {
    id: usize,
    capability: String,
    suite: String,
    name: String,
    only: bool,
    file: PathBuf,
    command: Option<String>,
    inner: Mutex<TaskInner>,
}

impl Task {
    pub fn new(
        capability: impl Into<String>,
        suite: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let (signal, _) = watch::channel(None);
        Self {
            id: 0,
            capability: capability.into(),
            suite: suite.into(),
            name: name.into(),
            only: false,
            file: PathBuf::new(),
            command: None,
            inner: Mutex::new(TaskInner {
                state: TaskState::Created,
                error: None,
                attempts: 0,
                signal,
            }),
        }
    }

    pub fn with_only(mut self, only: bool) -> Self {
        self.only = only;
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = file.into();
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Assign the registry-wide id (set once the global task list is final)
    pub fn with_id(mut self, id: usize) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn capability(&self) -> &str {
        &self.capability
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_only(&self) -> bool {
        self.only
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn state(&self) -> TaskState {
        self.inner.lock().state
    }

    pub fn error(&self) -> Option<String> {
        self.inner.lock().error.clone()
    }

    pub fn has_error(&self) -> bool {
        self.inner.lock().error.is_some()
    }

    /// Number of rounds this task has been dispatched in
    pub fn attempts(&self) -> u32 {
        self.inner.lock().attempts
    }

    /// Outcome of the current round, if the task has completed
    pub fn outcome(&self) -> Option<TaskOutcome> {
        self.inner.lock().signal.borrow().clone()
    }

    /// Created -> Dispatched. Rejects a task that is already in flight.
    pub fn mark_dispatched(&self) -> Result<(), DispatchError> {
        let mut inner = self.inner.lock();
        if inner.state != TaskState::Created {
            return Err(DispatchError::NotDispatchable {
                id: self.id,
                state: inner.state.to_string(),
            });
        }
        inner.state = TaskState::Dispatched;
        inner.attempts += 1;
        Ok(())
    }

    /// Dispatched -> Running
    pub fn mark_running(&self) {
        let mut inner = self.inner.lock();
        if inner.state == TaskState::Dispatched {
            inner.state = TaskState::Running;
        }
    }

    /// Resolve the completion signal. Returns `false` if it was already resolved.
    pub fn complete(&self, outcome: TaskOutcome) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == TaskState::Completed || inner.signal.borrow().is_some() {
            return false;
        }
        inner.state = TaskState::Completed;
        inner.error = outcome.error().map(str::to_string);
        inner.signal.send_replace(Some(outcome));
        true
    }

    /// Prepare the task for another round: state, error and signal are fresh.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        let (signal, _) = watch::channel(None);
        inner.state = TaskState::Created;
        inner.error = None;
        inner.signal = signal;
    }

    /// Completion signal of the current round
    pub fn completion(&self) -> CompletionSignal {
        CompletionSignal {
            rx: self.inner.lock().signal.subscribe(),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} > {}", self.capability, self.suite, self.name)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("capability", &self.capability)
            .field("suite", &self.suite)
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

/// One-shot completion signal for a single round of a task
pub struct CompletionSignal {
    rx: watch::Receiver<Option<TaskOutcome>>,
}

impl CompletionSignal {
    /// Wait until the task resolves
    pub async fn wait(mut self) -> TaskOutcome {
        match self.rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or(TaskOutcome::Ok),
            Err(_) => TaskOutcome::Error("completion signal dropped by reset".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        Task::new("chrome", "Home", "renders").with_id(7)
    }

    #[test]
    fn test_lifecycle_transitions() {
        let task = task();
        assert_eq!(task.state(), TaskState::Created);

        task.mark_dispatched().unwrap();
        assert_eq!(task.state(), TaskState::Dispatched);
        task.mark_running();
        assert_eq!(task.state(), TaskState::Running);

        assert!(task.complete(TaskOutcome::Error("boom".to_string())));
        assert_eq!(task.state(), TaskState::Completed);
        assert_eq!(task.error().as_deref(), Some("boom"));
        assert_eq!(task.attempts(), 1);
    }

    #[test]
    fn test_double_dispatch_rejected() {
        let task = task();
        task.mark_dispatched().unwrap();
        let err = task.mark_dispatched().unwrap_err();
        assert_eq!(
            err,
            DispatchError::NotDispatchable {
                id: 7,
                state: "dispatched".to_string()
            }
        );
    }

    #[test]
    fn test_complete_resolves_once() {
        let task = task();
        task.mark_dispatched().unwrap();
        task.mark_running();
        assert!(task.complete(TaskOutcome::Ok));
        assert!(!task.complete(TaskOutcome::Error("late".to_string())));
        assert_eq!(task.outcome(), Some(TaskOutcome::Ok));
        assert!(!task.has_error());
    }

    #[test]
    fn test_reset_keeps_identity() {
        let task = task();
        task.mark_dispatched().unwrap();
        task.mark_running();
        task.complete(TaskOutcome::Error("flaky".to_string()));

        task.reset();
        assert_eq!(task.id(), 7);
        assert_eq!(task.state(), TaskState::Created);
        assert_eq!(task.error(), None);
        assert_eq!(task.outcome(), None);
        // attempts span rounds
        assert_eq!(task.attempts(), 1);
    }

    #[tokio::test]
    async fn test_completion_signal_waits() {
        let task = std::sync::Arc::new(task());
        let signal = task.completion();

        let t = task.clone();
        tokio::spawn(async move {
            t.mark_dispatched().unwrap();
            t.mark_running();
            t.complete(TaskOutcome::Ok);
        });

        assert_eq!(signal.wait().await, TaskOutcome::Ok);
    }

    #[tokio::test]
    async fn test_signal_after_completion_resolves_immediately() {
        let task = task();
        task.mark_dispatched().unwrap();
        task.mark_running();
        task.complete(TaskOutcome::Error("x".to_string()));
        let outcome = task.completion().wait().await;
        assert_eq!(outcome.error(), Some("x"));
    }

    #[test]
    fn test_display() {
        assert_eq!(task().to_string(), "[chrome] Home > renders");
    }
}
