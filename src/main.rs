//! testfleet - Capability-scoped test-run orchestrator
//!
//! Loads test suites from spec files once per capability (a named execution
//! environment), runs every resulting task through a bounded per-capability
//! pool, retries the failures for a configured number of rounds and kills
//! any processes the launched commands left behind before exiting.
//!
//! ## Features
//!
//! - `only` suites narrow a whole run down to one suite
//! - FIFO pools with a concurrency limit per capability
//! - Retry rounds that re-run only what failed in the previous round
//! - Multiple output formats (Table, Summary, JSON)
//! - Orphan process reaping on every exit path
//!
//! ## Usage
//!
//! ```bash
//! # Run every spec file under ./spec for every configured capability
//! testfleet
//!
//! # Run two files on one capability, with 2 retry rounds
//! testfleet --spec spec/home.yaml,spec/cart.yaml --cap chromeLike -r 2
//!
//! # Show the resolved task set without running it
//! testfleet list --cap chromeLike
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

mod cli;
mod config;
mod error;
mod executor;
mod models;
mod output;
mod reaper;
mod suite;
mod utils;

use cli::{Args, Command, ConfigAction};
use config::{AppConfig, EnvConfig};
use executor::{CommandLauncher, Launcher, PoolManager, TestRunner};
use models::RunSummary;
use output::{write_summary_to_file, OutputFormat, ResultFormatter};
use reaper::{ProcTree, ProcessReaper};
use suite::{discover_spec_files, Registration, SuiteRegistry, YamlSuiteLoader};
use utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let env = EnvConfig::load();

    init_logger(LogLevel::resolve(
        args.log_level.as_deref(),
        args.verbose,
        env.log.as_deref(),
    ));

    let reaper = ProcessReaper::new(ProcTree::new());
    let code = run_to_exit(args, env, &reaper).await;
    std::process::exit(code)
}

/// Every terminal path ends here: the run's exit code, after reaping once
async fn run_to_exit(args: Args, env: EnvConfig, reaper: &ProcessReaper) -> i32 {
    let code = match run(args, env).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };

    reaper.reap();
    code
}

async fn run(args: Args, env: EnvConfig) -> Result<i32> {
    let explicit = args.config.as_deref().or(env.config_file.as_deref());

    if let Some(Command::Config(config_args)) = &args.command {
        manage_config(&config_args.action, explicit, &env, &args.format)?;
        return Ok(0);
    }

    let mut config = AppConfig::resolve(explicit)?;
    if env.has_any() {
        debug!("Applying TESTFLEET_* environment overrides");
    }
    config.apply_env(&env);
    if let Some(retries) = args.retries {
        config.retries = retries;
    }

    let files = if args.spec.is_empty() {
        discover_spec_files(&config.spec_dir)
    } else {
        args.spec.clone()
    };
    let capabilities = if args.cap.is_empty() {
        config.capability_names()
    } else {
        args.cap.clone()
    };

    info!(">>> Selected capabilities: {}", capabilities.join(", "));
    debug!("Spec files: {:?}", files);

    let registration =
        SuiteRegistry::new(YamlSuiteLoader::new()).register(&config, &capabilities, &files)?;

    let format = OutputFormat::from_str(&args.format).unwrap_or_else(|| {
        warn!("Unknown output format '{}', using table", args.format);
        OutputFormat::Table
    });
    let formatter = ResultFormatter::new(format);

    match args.command {
        Some(Command::List) => {
            println!("{}", formatter.format_tasks(&registration.tasks));
            Ok(0)
        }
        Some(Command::Config(_)) => Ok(0),
        None => {
            let launcher: Arc<dyn Launcher> = Arc::new(CommandLauncher::new());
            let summary = execute(&config, &registration, launcher).await;

            println!("{}", formatter.format_summary(&summary));

            if let Some(path) = &args.output {
                match write_summary_to_file(path, &summary, format) {
                    Ok(()) => info!("Summary saved to {}", path),
                    Err(e) => warn!("Failed to save summary to {}: {:#}", path, e),
                }
            }

            Ok(summary.exit_code())
        }
    }
}

fn manage_config(
    action: &ConfigAction,
    explicit: Option<&str>,
    env: &EnvConfig,
    format: &str,
) -> Result<()> {
    match action {
        ConfigAction::Init { output, force } => {
            let path = Path::new(output);
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {output}. Use --force to overwrite."
                );
            }

            AppConfig::example().save(path)?;
            println!("✓ Configuration file created: {output}");
            println!("\nEdit the file to declare your capabilities.");
        }

        ConfigAction::Show { env: true } => {
            if !env.has_any() {
                println!("No TESTFLEET_* overrides set");
            }
            let overrides = [
                ("CONFIG", env.config_file.clone()),
                ("RETRIES", env.retries.map(|v| v.to_string())),
                ("SPEC_DIR", env.spec_dir.clone()),
                ("TASK_TIMEOUT", env.task_timeout.map(|v| v.to_string())),
                ("LOG", env.log.clone()),
            ];
            for (name, value) in overrides {
                if let Some(value) = value {
                    println!("  TESTFLEET_{name:13} = {value}");
                }
            }
        }

        ConfigAction::Show { env: false } => {
            let mut config = AppConfig::resolve(explicit)?;
            config.apply_env(env);
            let output = if format.starts_with("json") {
                serde_json::to_string_pretty(&config)?
            } else {
                serde_yaml::to_string(&config)?
            };
            println!("{output}");
        }

        ConfigAction::Validate { file } => {
            let path = file
                .clone()
                .or_else(|| explicit.map(str::to_string))
                .or_else(|| AppConfig::find().map(|p| p.to_string_lossy().to_string()))
                .unwrap_or_else(|| "./testfleet.yaml".to_string());

            match AppConfig::load(&path) {
                Ok(config) => {
                    println!("✓ Configuration file is valid: {path}");
                    println!("  Capabilities: {}", config.capability_names().join(", "));
                }
                Err(e) => {
                    println!("✗ Configuration file is invalid: {path}");
                    println!("  Error: {e:#}");
                    return Err(e);
                }
            }
        }
    }

    Ok(())
}

/// Run a registered task set to completion, retries included
async fn execute(
    config: &AppConfig,
    registration: &Registration,
    launcher: Arc<dyn Launcher>,
) -> RunSummary {
    let pools = PoolManager::with_task_timeout(
        &registration.capabilities,
        launcher,
        config.task_timeout_secs.map(Duration::from_secs),
    );

    if let Some(suite) = registration.selection.selected_suite() {
        info!(">>> Only-suite '{}' selected", suite);
    }

    let mut runner = TestRunner::new(pools, config.retries);
    let summary = runner.run(&registration.tasks).await;

    for stats in runner.pools().all_stats() {
        debug!(
            "{}: capacity {}, peak {}",
            stats.capability, stats.capacity, stats.high_water
        );
    }

    summary
}
