//! Output formatters for run results
//!
//! Provides table, one-line summary and JSON output formats.

use std::io::Write;
use std::sync::Arc;

use crate::models::{RoundReport, RunStatus, RunSummary, Task};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Summary,
    Json,
    JsonPretty,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "summary" => Some(OutputFormat::Summary),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn paint(&self, text: &str, color: u8) -> String {
        if self.colorize {
            format!("\x1b[{color}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn format_round_table(&self, report: &RoundReport) -> String {
        let mut output = String::new();
        let label = if report.round == 1 {
            "initial".to_string()
        } else {
            format!("retry {}", report.round - 1)
        };

        output.push_str(&format!(
            "  Round {:2} ({:9}) {:4}/{:<4} ok ({:5.1}%) {:6}ms\n",
            report.round,
            label,
            report.ok,
            report.total,
            report.pass_rate(),
            report.duration_ms
        ));
        for record in &report.errored {
            output.push_str(&format!("      {} {}\n", self.paint("✗", 31), record));
        }
        output
    }

    /// Format the whole run
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Summary => self.format_summary_brief(summary),
            OutputFormat::Json => serde_json::to_string(summary).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(summary).unwrap_or_default(),
        }
    }

    fn status_str(&self, status: RunStatus) -> String {
        match status {
            RunStatus::Passed => self.paint(&status.to_string(), 32),
            _ => self.paint(&status.to_string(), 31),
        }
    }

    fn format_summary_table(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        output.push_str("\n══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            " Test run started {} - {} tasks\n",
            summary.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            summary.total_tasks
        ));
        output.push_str("══════════════════════════════════════════════════════════════\n");

        for report in &summary.rounds {
            output.push_str(&self.format_round_table(report));
        }

        output.push_str("──────────────────────────────────────────────────────────────\n");
        output.push_str(&format!(
            " Result: {} | Retry rounds: {} | Exit code: {}\n",
            self.status_str(summary.status),
            summary.retry_rounds(),
            summary.exit_code()
        ));

        output
    }

    fn format_summary_brief(&self, summary: &RunSummary) -> String {
        let still_failing = summary.last_round().map(|r| r.error_count()).unwrap_or(0);
        format!(
            "{} - {} tasks, {} round(s), {} still failing",
            self.status_str(summary.status),
            summary.total_tasks,
            summary.rounds.len(),
            still_failing
        )
    }

    /// Format the resolved task set, for listing without running
    pub fn format_tasks(&self, tasks: &[Arc<Task>]) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => {
                let records: Vec<_> = tasks
                    .iter()
                    .map(|t| crate::models::TaskRecord::from_task(t))
                    .collect();
                if self.format == OutputFormat::JsonPretty {
                    serde_json::to_string_pretty(&records).unwrap_or_default()
                } else {
                    serde_json::to_string(&records).unwrap_or_default()
                }
            }
            _ => {
                let mut output = String::new();
                let mut current = String::new();
                for task in tasks {
                    if task.capability() != current {
                        current = task.capability().to_string();
                        output.push_str(&format!("\n{current}:\n"));
                    }
                    let marker = if task.is_only() { "*" } else { " " };
                    output.push_str(&format!(
                        "  {:3}.{} {} > {}  [{}]\n",
                        task.id(),
                        marker,
                        task.suite(),
                        task.name(),
                        task.file().display()
                    ));
                }
                output.push_str(&format!("\n{} tasks\n", tasks.len()));
                output
            }
        }
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// Write a run summary to a file, without color
pub fn write_summary_to_file(
    path: &str,
    summary: &RunSummary,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let formatter = ResultFormatter::new(format).no_color();
    let content = formatter.format_summary(summary);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
