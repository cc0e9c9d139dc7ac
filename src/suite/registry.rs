//! Suite registry
//!
//! Builds the global task list from every (capability, file) pair in
//! capability-major order. "Only" selection is first-seen-wins across the
//! whole run: once a load reports an only-suite, every later load that does
//! not report the same suite name is dropped in full, including tasks that
//! have nothing to do with any only-suite.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{LoadedFile, SuiteLoader};
use crate::config::AppConfig;
use crate::error::ConfigError;
use crate::models::{Capability, Task};

/// Run-wide "only" selection
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
    active: bool,
    selected_suite: Option<String>,
}

impl SelectionState {
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn selected_suite(&self) -> Option<&str> {
        self.selected_suite.as_deref()
    }

    fn activate(suite: Option<String>) -> Self {
        Self {
            active: true,
            selected_suite: suite,
        }
    }
}

/// What happened to one load's tasks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Merge {
    Appended(usize),
    /// First only-suite seen: the accumulated list was replaced
    Replaced(usize),
    Discarded(usize),
}

/// Fold one load into the accumulated task list
pub fn merge_loaded(
    state: SelectionState,
    tasks: &mut Vec<Task>,
    loaded: LoadedFile,
) -> (SelectionState, Merge) {
    let count = loaded.tasks.len();

    if state.is_active() {
        if state.selected_suite() == loaded.only_suite_name.as_deref() {
            tasks.extend(loaded.tasks);
            return (state, Merge::Appended(count));
        }
        return (state, Merge::Discarded(count));
    }

    if loaded.has_only {
        *tasks = loaded.tasks;
        return (
            SelectionState::activate(loaded.only_suite_name),
            Merge::Replaced(count),
        );
    }

    tasks.extend(loaded.tasks);
    (state, Merge::Appended(count))
}

/// Result of registering every selected file
#[derive(Debug)]
pub struct Registration {
    /// Global task list, ids assigned in registration order
    pub tasks: Vec<Arc<Task>>,
    pub capabilities: Vec<Capability>,
    pub selection: SelectionState,
}

/// Loads spec files per capability through a [`SuiteLoader`]
pub struct SuiteRegistry<L> {
    loader: L,
}

impl<L: SuiteLoader> SuiteRegistry<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    /// Register every (capability, file) pair. Fails before anything runs
    /// on an unknown capability or a missing file.
    pub fn register(
        &self,
        config: &AppConfig,
        capability_names: &[String],
        files: &[PathBuf],
    ) -> Result<Registration, ConfigError> {
        if capability_names.is_empty() {
            return Err(ConfigError::Invalid("no capabilities selected".to_string()));
        }

        let mut selection = SelectionState::inactive();
        let mut tasks = Vec::new();
        let mut capabilities = Vec::with_capacity(capability_names.len());

        for name in capability_names {
            let cap_config = config.capability(name)?;

            for file in files {
                if !file.exists() {
                    return Err(ConfigError::MissingSpecFile(file.clone()));
                }

                let loaded = self.loader.load(name, file)?;
                let (next, merge) = merge_loaded(selection, &mut tasks, loaded);
                selection = next;

                match merge {
                    Merge::Appended(n) => {
                        debug!("[{}] {}: registered {} tasks", name, file.display(), n)
                    }
                    Merge::Replaced(n) => info!(
                        "[{}] {}: only-suite '{}' selected ({} tasks)",
                        name,
                        file.display(),
                        selection.selected_suite().unwrap_or_default(),
                        n
                    ),
                    Merge::Discarded(n) => warn!(
                        "[{}] {}: ignoring {} tasks outside only-suite '{}'",
                        name,
                        file.display(),
                        n,
                        selection.selected_suite().unwrap_or_default()
                    ),
                }
            }

            capabilities.push(Capability::from_config(name, cap_config, files));
        }

        let tasks = tasks
            .into_iter()
            .enumerate()
            .map(|(id, task)| Arc::new(task.with_id(id)))
            .collect();

        Ok(Registration {
            tasks,
            capabilities,
            selection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CapabilityConfig;
    use std::collections::HashMap;
    use std::path::Path;
    use tempfile::TempDir;

    /// Serves canned loads keyed by (capability, file name)
    #[derive(Default)]
    struct FakeLoader {
        files: HashMap<(String, String), (Vec<&'static str>, Option<&'static str>)>,
    }

    impl FakeLoader {
        /// `suites` are the suite names of one task each; `only` marks the only-suite
        fn add(mut self, cap: &str, file: &str, suites: Vec<&'static str>, only: Option<&'static str>) -> Self {
            self.files
                .insert((cap.to_string(), file.to_string()), (suites, only));
            self
        }
    }

    impl SuiteLoader for FakeLoader {
        fn load(&self, capability: &str, path: &Path) -> Result<LoadedFile, ConfigError> {
            let file = path.file_name().unwrap().to_string_lossy().to_string();
            let (suites, only) = self
                .files
                .get(&(capability.to_string(), file.clone()))
                .cloned()
                .unwrap_or_default();
            let tasks = suites
                .iter()
                .map(|suite| Task::new(capability, *suite, format!("{file} test")))
                .collect();
            let loaded = LoadedFile::new(tasks);
            Ok(match only {
                Some(name) => loaded.with_only(name),
                None => loaded,
            })
        }
    }

    fn spec_dir(names: &[&str]) -> (TempDir, Vec<PathBuf>) {
        let dir = tempfile::tempdir().unwrap();
        let files = names
            .iter()
            .map(|n| {
                let path = dir.path().join(n);
                std::fs::write(&path, "").unwrap();
                path
            })
            .collect();
        (dir, files)
    }

    fn config(caps: &[(&str, usize)]) -> AppConfig {
        let mut config = AppConfig::default();
        for (name, concurrency) in caps {
            config
                .capabilities
                .insert(name.to_string(), CapabilityConfig::new(*concurrency));
        }
        config
    }

    fn caps(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn suites_of(reg: &Registration) -> Vec<(String, String)> {
        reg.tasks
            .iter()
            .map(|t| (t.capability().to_string(), t.suite().to_string()))
            .collect()
    }

    #[test]
    fn test_no_only_appends_everything() {
        let (_dir, files) = spec_dir(&["a.yaml", "b.yaml"]);
        let loader = FakeLoader::default()
            .add("chrome", "a.yaml", vec!["A1", "A2"], None)
            .add("chrome", "b.yaml", vec!["B1"], None)
            .add("firefox", "a.yaml", vec!["A1"], None);
        let reg = SuiteRegistry::new(loader)
            .register(&config(&[("chrome", 2), ("firefox", 1)]), &caps(&["chrome", "firefox"]), &files)
            .unwrap();

        assert!(!reg.selection.is_active());
        assert_eq!(reg.tasks.len(), 4);
        let ids: Vec<usize> = reg.tasks.iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(reg.capabilities.len(), 2);
        assert_eq!(reg.capabilities[0].concurrency, 2);
        assert_eq!(reg.capabilities[0].files, files);
    }

    #[test]
    fn test_first_only_replaces_accumulated() {
        let (_dir, files) = spec_dir(&["a.yaml", "b.yaml", "c.yaml"]);
        let loader = FakeLoader::default()
            .add("chrome", "a.yaml", vec!["Plain"], None)
            .add("chrome", "b.yaml", vec!["X"], Some("X"))
            .add("chrome", "c.yaml", vec!["Unrelated"], None);
        let reg = SuiteRegistry::new(loader)
            .register(&config(&[("chrome", 1)]), &caps(&["chrome"]), &files)
            .unwrap();

        assert_eq!(reg.selection.selected_suite(), Some("X"));
        // earlier tasks replaced, later non-only file discarded
        assert_eq!(suites_of(&reg), vec![("chrome".to_string(), "X".to_string())]);
    }

    #[test]
    fn test_only_precedence_across_capabilities() {
        let (_dir, files) = spec_dir(&["a.yaml"]);
        let loader = FakeLoader::default()
            .add("capA", "a.yaml", vec!["X", "X"], Some("X"))
            .add("capB", "a.yaml", vec!["Y", "Z"], Some("Y"));
        let reg = SuiteRegistry::new(loader)
            .register(&config(&[("capA", 1), ("capB", 1)]), &caps(&["capA", "capB"]), &files)
            .unwrap();

        assert_eq!(reg.selection.selected_suite(), Some("X"));
        assert_eq!(reg.tasks.len(), 2);
        assert!(reg.tasks.iter().all(|t| t.capability() == "capA" && t.suite() == "X"));
    }

    #[test]
    fn test_matching_only_in_other_capability_is_kept() {
        let (_dir, files) = spec_dir(&["a.yaml"]);
        let loader = FakeLoader::default()
            .add("capA", "a.yaml", vec!["X"], Some("X"))
            .add("capB", "a.yaml", vec!["X"], Some("X"));
        let reg = SuiteRegistry::new(loader)
            .register(&config(&[("capA", 1), ("capB", 1)]), &caps(&["capA", "capB"]), &files)
            .unwrap();

        assert_eq!(
            suites_of(&reg),
            vec![
                ("capA".to_string(), "X".to_string()),
                ("capB".to_string(), "X".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_capability_is_fatal() {
        let (_dir, files) = spec_dir(&["a.yaml"]);
        let err = SuiteRegistry::new(FakeLoader::default())
            .register(&config(&[("chrome", 1)]), &caps(&["chrome", "safari"]), &files)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCapability(name) if name == "safari"));
    }

    #[test]
    fn test_no_capabilities_is_fatal() {
        let (_dir, files) = spec_dir(&["a.yaml"]);
        let err = SuiteRegistry::new(FakeLoader::default())
            .register(&AppConfig::default(), &[], &files)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let (dir, mut files) = spec_dir(&["a.yaml"]);
        files.push(dir.path().join("missing.yaml"));
        let err = SuiteRegistry::new(FakeLoader::default())
            .register(&config(&[("chrome", 1)]), &caps(&["chrome"]), &files)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingSpecFile(path) if path.ends_with("missing.yaml")));
    }

    #[test]
    fn test_merge_loaded_state_machine() {
        let mut tasks = vec![Task::new("c", "Old", "t")];

        let (state, merge) = merge_loaded(
            SelectionState::inactive(),
            &mut tasks,
            LoadedFile::new(vec![Task::new("c", "S", "t")]).with_only("S"),
        );
        assert_eq!(merge, Merge::Replaced(1));
        assert!(state.is_active());

        let (state, merge) = merge_loaded(
            state,
            &mut tasks,
            LoadedFile::new(vec![Task::new("c", "Free", "t"), Task::new("c", "Free", "u")]),
        );
        assert_eq!(merge, Merge::Discarded(2));

        let (state, merge) = merge_loaded(
            state,
            &mut tasks,
            LoadedFile::new(vec![Task::new("c", "S", "u")]).with_only("S"),
        );
        assert_eq!(merge, Merge::Appended(1));
        assert_eq!(state.selected_suite(), Some("S"));
        assert_eq!(tasks.len(), 2);
    }
}
