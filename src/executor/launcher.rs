//! Task launchers
//!
//! A launcher starts one task for one capability and resolves when the task
//! is done. The pool turns its result into the task's completion outcome.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::LaunchError;
use crate::models::{Capability, Task};

/// Runs a single task
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, capability: &Capability, task: &Task) -> Result<(), LaunchError>;
}

/// Shell every command runs under
const SHELL: &str = "sh";

/// How long stderr may keep draining once the shell has exited. Background
/// processes that inherited the pipe would otherwise hold it open.
const STDERR_GRACE: Duration = Duration::from_millis(200);

/// Runs each task's `command` through `sh -c`
#[derive(Clone, Debug, Default)]
pub struct CommandLauncher;

impl CommandLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Launcher for CommandLauncher {
    async fn launch(&self, capability: &Capability, task: &Task) -> Result<(), LaunchError> {
        let command = task.command().ok_or(LaunchError::MissingCommand)?;
        debug!("{}: {} -c {:?}", task, SHELL, command);

        let mut child = Command::new(SHELL)
            .arg("-c")
            .arg(command)
            .envs(&capability.env)
            .env("TESTFLEET_CAPABILITY", &capability.name)
            .env("TESTFLEET_SUITE", task.suite())
            .env("TESTFLEET_TEST", task.name())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let last_line = Arc::new(Mutex::new(None::<String>));
        let drain = child.stderr.take().map(|stderr| {
            let last_line = Arc::clone(&last_line);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if !line.trim().is_empty() {
                        *last_line.lock() = Some(line);
                    }
                }
            })
        });

        // the shell's exit ends the task, not the pipes closing
        let status = child.wait().await?;

        if let Some(mut drain) = drain {
            if tokio::time::timeout(STDERR_GRACE, &mut drain).await.is_err() {
                drain.abort();
            }
        }

        if status.success() {
            return Ok(());
        }

        let detail = last_line
            .lock()
            .take()
            .unwrap_or_else(|| "no stderr output".to_string());

        Err(LaunchError::Failed {
            status: status.to_string(),
            detail,
        })
    }
}
