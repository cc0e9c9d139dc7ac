//! Process reaping
//!
//! Launchers cannot be trusted to shut their child processes down, and an
//! orphan would be re-parented to init and outlive the run. Before exiting,
//! every descendant of this process is killed. This runs once, at the single
//! exit point, whatever the outcome of the run. On Linux the process also
//! registers as a child subreaper, so orphans of exited shells are re-parented
//! to it rather than to init.

mod procfs;

pub use procfs::ProcTree;

use tracing::{debug, info, warn};

use crate::error::ReapError;

/// OS process operations needed by the reaper
pub trait ProcessControl: Send + Sync {
    /// All transitive descendants of `pid`, parents before children
    fn descendants(&self, pid: u32) -> Result<Vec<u32>, ReapError>;

    /// Forcibly terminate `pid`
    fn kill(&self, pid: u32) -> Result<(), ReapError>;

    /// Make orphaned descendants re-parent to this process instead of init,
    /// so they stay reachable from it
    fn adopt_orphans(&self) -> Result<(), ReapError> {
        Ok(())
    }
}

/// What a reap pass did
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReapSummary {
    pub found: Vec<u32>,
    pub killed: Vec<u32>,
    pub failures: Vec<String>,
}

pub struct ProcessReaper {
    control: Box<dyn ProcessControl>,
    root: u32,
}

impl ProcessReaper {
    /// Reap descendants of the current process. Call before anything is
    /// launched: processes orphaned earlier are already lost to init.
    pub fn new(control: impl ProcessControl + 'static) -> Self {
        if let Err(e) = control.adopt_orphans() {
            warn!("{}", e);
        }
        Self {
            control: Box::new(control),
            root: std::process::id(),
        }
    }

    #[cfg(test)]
    pub fn with_root(mut self, pid: u32) -> Self {
        self.root = pid;
        self
    }

    /// Kill every descendant. Failures are logged and collected, never raised.
    pub fn reap(&self) -> ReapSummary {
        let mut summary = ReapSummary::default();

        match self.control.descendants(self.root) {
            Ok(pids) => summary.found = pids,
            Err(e) => {
                warn!("Cannot list child processes: {}", e);
                summary.failures.push(e.to_string());
                return summary;
            }
        }

        if summary.found.is_empty() {
            debug!("No child processes left to reap");
            return summary;
        }

        info!("Reaping {} child processes", summary.found.len());
        for &pid in &summary.found {
            match self.control.kill(pid) {
                Ok(()) => summary.killed.push(pid),
                Err(e) => {
                    warn!("{}", e);
                    summary.failures.push(e.to_string());
                }
            }
        }

        summary
    }
}


#[cfg(test)]
mod tests {
    use super::mock::FakeProcesses;
    use super::*;

    #[test]
    fn test_reaps_whole_tree() {
        let procs = FakeProcesses::new()
            .spawn(100, 101)
            .spawn(101, 102)
            .spawn(102, 103)
            .spawn(100, 104)
            .spawn(999, 1000);
        let killed = procs.killed.clone();

        let summary = ProcessReaper::new(procs).with_root(100).reap();

        let mut found = summary.found.clone();
        found.sort();
        assert_eq!(found, vec![101, 102, 103, 104]);
        assert_eq!(summary.killed.len(), 4);
        assert!(summary.failures.is_empty());
        assert!(!killed.lock().contains(&1000));
    }

    #[test]
    fn test_kill_failure_is_not_fatal() {
        let procs = FakeProcesses::new()
            .spawn(1, 2)
            .spawn(1, 3)
            .unkillable(2);

        let summary = ProcessReaper::new(procs).with_root(1).reap();

        assert_eq!(summary.killed, vec![3]);
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].contains("EPERM"));
    }

    #[test]
    fn test_enumeration_failure_is_not_fatal() {
        let summary = ProcessReaper::new(FakeProcesses::new().broken())
            .with_root(1)
            .reap();
        assert!(summary.found.is_empty());
        assert_eq!(summary.failures.len(), 1);
    }

    #[test]
    fn test_nothing_to_reap() {
        let summary = ProcessReaper::new(FakeProcesses::new()).with_root(1).reap();
        assert_eq!(summary, ReapSummary::default());
    }
}
