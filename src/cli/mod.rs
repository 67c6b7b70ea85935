//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::Parser;
use std::path::PathBuf;

use testfleet::config::RunConfig;

/// Parallel test-file runner
#[derive(Parser, Debug)]
#[command(name = "testfleet")]
#[command(author = "hephaex@gmail.com")]
#[command(version)]
#[command(about = "Run test files in parallel isolated worker processes")]
#[command(long_about = None)]
pub struct Args {
    /// Test files to run, in order
    #[arg(required_unless_present = "env_help")]
    pub files: Vec<String>,

    /// Number of concurrent workers (1-64)
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Per-file timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Stop starting new files after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Collect coverage in workers
    #[arg(long)]
    pub coverage: bool,

    /// Merge worker coverage into the report
    #[arg(long)]
    pub aggregate_coverage: bool,

    /// Print each worker's captured output
    #[arg(long)]
    pub show_output: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Only run tests with this tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Only run tests matching this pattern
    #[arg(long)]
    pub filter: Option<String>,

    /// Program used to run each file
    #[arg(long)]
    pub interpreter: Option<String>,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format (table, json, json-pretty, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Save the report to a file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Show supported environment variables and exit
    #[arg(long)]
    pub env_help: bool,
}

impl Args {
    /// Apply command-line overrides (flags take precedence)
    pub fn apply(&self, mut config: RunConfig) -> RunConfig {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_seconds = timeout;
        }
        if self.fail_fast {
            config.fail_fast = true;
        }
        if self.coverage {
            config.coverage_enabled = true;
        }
        if self.aggregate_coverage {
            config.aggregate_coverage = true;
        }
        if self.show_output {
            config.show_worker_output = true;
        }
        if self.verbose {
            config.verbose = true;
        }
        if !self.tags.is_empty() {
            config.tags = self.tags.clone();
        }
        if let Some(filter) = &self.filter {
            config.filter = Some(filter.clone());
        }
        if let Some(interpreter) = &self.interpreter {
            config.interpreter = interpreter.clone();
        }
        config
    }
}
