//! Test-definition loading and task registration
//!
//! A [`SuiteLoader`] turns one spec file into tasks for one capability. The
//! [`SuiteRegistry`] calls it for every (capability, file) pair and resolves
//! "only" selection across all of them.

mod discover;
mod registry;
mod yaml;

pub use discover::discover_spec_files;
pub use registry::{Registration, SuiteRegistry};
pub use yaml::YamlSuiteLoader;

use std::path::Path;

use crate::error::ConfigError;
use crate::models::Task;

/// Tasks registered by one (capability, file) load
#[derive(Debug, Default)]
pub struct LoadedFile {
    /// Tasks in declaration order
    pub tasks: Vec<Task>,
    pub has_only: bool,
    pub only_suite_name: Option<String>,
}

impl LoadedFile {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            has_only: false,
            only_suite_name: None,
        }
    }

    /// Mark the load as carrying an "only" suite
    pub fn with_only(mut self, suite: impl Into<String>) -> Self {
        self.has_only = true;
        self.only_suite_name = Some(suite.into());
        self
    }
}

/// Produces tasks from a test-definition file
pub trait SuiteLoader: Send + Sync {
    fn load(&self, capability: &str, path: &Path) -> Result<LoadedFile, ConfigError>;
}
