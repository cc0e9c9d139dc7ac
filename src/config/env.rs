//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "TESTFLEET";

/// Overrides read from `TESTFLEET_*` variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Config file from TESTFLEET_CONFIG
    pub config_file: Option<String>,
    /// Retries from TESTFLEET_RETRIES
    pub retries: Option<u32>,
    /// Spec directory from TESTFLEET_SPEC_DIR
    pub spec_dir: Option<String>,
    /// Per-task timeout from TESTFLEET_TASK_TIMEOUT
    pub task_timeout: Option<u64>,
    /// Log level from TESTFLEET_LOG
    pub log: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            config_file: get_env("CONFIG"),
            retries: get_env_parse("RETRIES"),
            spec_dir: get_env("SPEC_DIR"),
            task_timeout: get_env_parse("TASK_TIMEOUT"),
            log: get_env("LOG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.config_file.is_some()
            || self.retries.is_some()
            || self.spec_dir.is_some()
            || self.task_timeout.is_some()
            || self.log.is_some()
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}
