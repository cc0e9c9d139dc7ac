//! Capability model
//!
//! A capability is a named execution profile (browser, device, environment)
//! with its own concurrency limit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::CapabilityConfig;

/// Resolved execution profile, immutable for the run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub concurrency: usize,
    pub env: BTreeMap<String, String>,
    pub files: Vec<PathBuf>,
}

impl Capability {
    #[cfg(test)]
    pub fn new(name: impl Into<String>, concurrency: usize) -> Self {
        Self {
            name: name.into(),
            concurrency: concurrency.max(1),
            env: BTreeMap::new(),
            files: Vec::new(),
        }
    }

    /// Build from configuration, binding the selected spec files
    pub fn from_config(name: &str, config: &CapabilityConfig, files: &[PathBuf]) -> Self {
        Self {
            name: name.to_string(),
            concurrency: config.concurrency.max(1),
            env: config.env.clone(),
            files: files.to_vec(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (x{})", self.name, self.concurrency)
    }
}
