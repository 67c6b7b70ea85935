//! Output formatters for run results
//!
//! Provides table, JSON, and summary output for an aggregate result.

use std::io::Write;

use crate::models::{AggregateResult, ErrorKind};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Report formatter
pub struct ReportFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ReportFormatter {
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

    /// Format the aggregate of a run
    pub fn format(&self, result: &AggregateResult) -> String {
        match self.format {
            OutputFormat::Table => self.format_table(result),
            OutputFormat::Json => serde_json::to_string(result).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Summary => self.format_brief(result),
        }
    }

    fn paint(&self, text: impl std::fmt::Display, code: &str) -> String {
        if self.colorize {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn format_table(&self, result: &AggregateResult) -> String {
        let mut output = String::new();

        if !result.worker_outputs.is_empty() {
            for worker in &result.worker_outputs {
                output.push_str(&format!("\n── {} ──\n", worker.file));
                output.push_str(worker.output.trim_end());
                output.push('\n');
            }
        }

        if !result.errors.is_empty() {
            output.push_str(&format!("\n{}\n", self.paint("Errors:", "1;31")));
            output.push_str("──────────────────────────────────────────────────────────────\n");
            for error in &result.errors {
                let label = match error.kind {
                    ErrorKind::Test => String::new(),
                    kind => format!(" [{kind}]"),
                };
                output.push_str(&format!(
                    "  {}{}: {}\n",
                    self.paint(&error.file, "1"),
                    label,
                    error.message
                ));
                if let Some(traceback) = &error.traceback {
                    for line in traceback.lines() {
                        output.push_str(&format!("      {line}\n"));
                    }
                }
            }
        }

        if !result.coverage.is_empty() {
            let summary = result.coverage.summary();
            output.push_str(&format!(
                "\nCoverage: {:.1}% lines ({}/{}) across {} files, {}/{} functions\n",
                summary.line_rate(),
                summary.lines_hit,
                summary.lines_tracked,
                summary.files,
                summary.functions_hit,
                summary.functions_tracked
            ));
        }

        let pass_str = self.paint(result.passed, "32");
        let fail_str = if result.failed > 0 {
            self.paint(result.failed, "31")
        } else {
            result.failed.to_string()
        };

        output.push_str("\n══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            " Files: {} run | {} failed\n",
            result.files_run.len(),
            result.failed_files.len()
        ));
        output.push_str(&format!(
            " Total: {} | Pass: {} | Fail: {} | Skip: {} | Pending: {}\n",
            result.total, pass_str, fail_str, result.skipped, result.pending
        ));
        output.push_str(&format!(
            " Pass Rate: {:5.1}% | Worker time: {:.2}s | Wall clock: {:.2}s\n",
            result.pass_rate(),
            result.elapsed,
            result.wall_clock
        ));
        output.push_str("══════════════════════════════════════════════════════════════\n");

        let verdict = if result.is_clean() {
            self.paint("PASSED", "1;32")
        } else {
            self.paint("FAILED", "1;31")
        };
        output.push_str(&format!(" {verdict}\n"));

        output
    }

    fn format_brief(&self, result: &AggregateResult) -> String {
        format!(
            "{}/{} passed ({:.1}%), {} failed, {} skipped, {} pending in {} files [{:.2}s]",
            result.passed,
            result.total,
            result.pass_rate(),
            result.failed,
            result.skipped,
            result.pending,
            result.files_run.len(),
            result.elapsed
        )
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// Write a report to a file
pub fn write_report_to_file(
    path: &str,
    result: &AggregateResult,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let formatter = ReportFormatter::new(format).no_color();
    let content = formatter.format(result);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
