//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Capability-scoped test-run orchestrator
#[derive(Parser, Debug)]
#[command(name = "testfleet")]
#[command(version)]
#[command(about = "Run test suites per capability with bounded concurrency and retries")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Spec files to run (comma-separated). Defaults to every spec file
    /// under the configured spec directory.
    #[arg(long, value_delimiter = ',', global = true)]
    pub spec: Vec<PathBuf>,

    /// Capabilities to run (comma-separated). Defaults to all configured.
    #[arg(long, value_delimiter = ',', global = true)]
    pub cap: Vec<String>,

    /// Configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override the configured number of retries
    #[arg(short, long)]
    pub retries: Option<u32>,

    /// Output format (table, summary, json, json-pretty)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,

    /// Save the run summary to a file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve and print the task set without running it
    List,

    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Output file path
        #[arg(default_value = "testfleet.yaml")]
        output: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show {
        /// Show environment overrides instead
        #[arg(long)]
        env: bool,
    },

    /// Validate a configuration file
    Validate {
        /// File to validate (defaults to the first standard location)
        file: Option<String>,
    },
}
