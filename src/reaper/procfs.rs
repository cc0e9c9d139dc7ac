//! Process tree from `/proc`
//!
//! Parent links come from the fourth field of `/proc/<pid>/stat`. The
//! command name in the second field may contain spaces and parentheses, so
//! fields are read after the last `)`.

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use super::ProcessControl;
use crate::error::ReapError;

#[derive(Clone, Debug)]
pub struct ProcTree {
    proc_root: PathBuf,
}

impl ProcTree {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Read the process table from another mount point
    pub fn with_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    /// parent pid -> child pids, snapshot of the current table
    fn children_map(&self) -> Result<HashMap<u32, Vec<u32>>, ReapError> {
        // no procfs: nothing can be enumerated, so nothing is reaped
        if cfg!(not(target_os = "linux")) && !self.proc_root.exists() {
            return Ok(HashMap::new());
        }

        let entries = std::fs::read_dir(&self.proc_root)
            .map_err(|e| ReapError::Enumerate(format!("{}: {e}", self.proc_root.display())))?;

        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        for entry in entries.flatten() {
            let Some(pid) = entry.file_name().to_str().and_then(|n| n.parse::<u32>().ok()) else {
                continue;
            };
            // processes may exit while the table is read
            let Ok(stat) = std::fs::read_to_string(entry.path().join("stat")) else {
                continue;
            };
            if let Some(ppid) = parse_ppid(&stat) {
                children.entry(ppid).or_default().push(pid);
            }
        }

        for pids in children.values_mut() {
            pids.sort_unstable();
        }
        Ok(children)
    }
}

impl Default for ProcTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessControl for ProcTree {
    fn descendants(&self, pid: u32) -> Result<Vec<u32>, ReapError> {
        let children = self.children_map()?;

        let mut out = Vec::new();
        let mut queue = VecDeque::from([pid]);
        while let Some(parent) = queue.pop_front() {
            for &child in children.get(&parent).into_iter().flatten() {
                if child != pid && !out.contains(&child) {
                    out.push(child);
                    queue.push_back(child);
                }
            }
        }
        Ok(out)
    }

    #[cfg(target_os = "linux")]
    fn adopt_orphans(&self) -> Result<(), ReapError> {
        nix::sys::prctl::set_child_subreaper(true)
            .map_err(|e| ReapError::Adopt(e.to_string()))
    }

    fn kill(&self, pid: u32) -> Result<(), ReapError> {
        let raw = i32::try_from(pid).map_err(|_| ReapError::Kill {
            pid,
            reason: "pid out of range".to_string(),
        })?;
        match kill(Pid::from_raw(raw), Signal::SIGKILL) {
            // already gone
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(ReapError::Kill {
                pid,
                reason: e.to_string(),
            }),
        }
    }
}

fn parse_ppid(stat: &str) -> Option<u32> {
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.split_whitespace().nth(1)?.parse().ok()
}
