//! Configuration module
//!
//! Handles loading and managing configuration. Values are layered:
//! CLI flags over `TESTFLEET_*` environment variables over the config file
//! over built-in defaults.

mod env;
mod file;

pub use env::EnvConfig;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ConfigError;

/// Application configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Retry rounds after the initial round (0 disables retries)
    pub retries: u32,

    /// Directory searched for spec files when none are selected
    pub spec_dir: String,

    /// Per-task timeout; `None` lets a stuck launcher hold its slot forever
    pub task_timeout_secs: Option<u64>,

    /// Capability name to capability settings, in declaration order
    pub capabilities: IndexMap<String, CapabilityConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            retries: 0,
            spec_dir: "./spec".to_string(),
            task_timeout_secs: None,
            capabilities: IndexMap::new(),
        }
    }
}

impl AppConfig {
    /// Look up a capability by name
    pub fn capability(&self, name: &str) -> Result<&CapabilityConfig, ConfigError> {
        self.capabilities
            .get(name)
            .ok_or_else(|| ConfigError::UnknownCapability(name.to_string()))
    }

    /// All configured capability names, in declaration order
    pub fn capability_names(&self) -> Vec<String> {
        self.capabilities.keys().cloned().collect()
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(retries) = env.retries {
            self.retries = retries;
        }
        if let Some(dir) = &env.spec_dir {
            self.spec_dir = dir.clone();
        }
        if let Some(timeout) = env.task_timeout {
            self.task_timeout_secs = Some(timeout);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, cap) in &self.capabilities {
            if cap.concurrency == 0 {
                return Err(ConfigError::Invalid(format!(
                    "capability '{name}' must have concurrency >= 1"
                )));
            }
        }
        if self.task_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "task_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-capability settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityConfig {
    /// Concurrent tasks allowed for this capability
    #[serde(default = "default_concurrency", alias = "instances")]
    pub concurrency: usize,

    /// Extra environment handed to the launcher
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_concurrency() -> usize {
    1
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            env: BTreeMap::new(),
        }
    }
}

impl CapabilityConfig {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.retries, 0);
        assert_eq!(config.spec_dir, "./spec");
        assert!(config.capabilities.is_empty());
    }

    #[test]
    fn test_unknown_capability() {
        let config = AppConfig::default();
        assert!(matches!(
            config.capability("safari"),
            Err(ConfigError::UnknownCapability(name)) if name == "safari"
        ));
    }

    #[test]
    fn test_instances_alias() {
        let yaml = "capabilities:\n  chrome:\n    instances: 3\n  firefox: {}\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.capabilities["chrome"].concurrency, 3);
        assert_eq!(config.capabilities["firefox"].concurrency, 1);
        assert_eq!(config.capability_names(), vec!["chrome", "firefox"]);
    }

    #[test]
    fn test_capability_names_keep_declaration_order() {
        let yaml = "capabilities:\n  zeta:\n    concurrency: 1\n  alpha:\n    concurrency: 2\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.capability_names(), vec!["zeta", "alpha"]);

        let json = serde_json::to_string(&config).unwrap();
        let reloaded: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded.capability_names(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = AppConfig::default();
        config
            .capabilities
            .insert("chrome".to_string(), CapabilityConfig::new(0));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_apply_env() {
        let mut config = AppConfig::default();
        let env = EnvConfig {
            retries: Some(3),
            task_timeout: Some(60),
            ..EnvConfig::default()
        };
        config.apply_env(&env);
        assert_eq!(config.retries, 3);
        assert_eq!(config.task_timeout_secs, Some(60));
        assert_eq!(config.spec_dir, "./spec");
    }
}
