//! Configuration module
//!
//! Defines the immutable run configuration and how it is layered from
//! defaults, config files, and environment variables.

mod env;
mod file;

pub use env::{print_env_help, EnvConfig};
pub use file::ConfigFile;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::RunnerError;

/// Upper bound on concurrent worker processes
pub const MAX_WORKERS: usize = 64;

/// Run configuration passed into the engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Concurrent worker processes (1-64)
    pub workers: usize,

    /// Per-file deadline in seconds
    pub timeout_seconds: u64,

    /// Stop dispatching after the first failed file
    pub fail_fast: bool,

    /// Merge worker coverage into the aggregate
    pub aggregate_coverage: bool,

    /// Keep each worker's captured output in the aggregate
    pub show_worker_output: bool,

    /// Log per-file results at info level
    pub verbose: bool,

    /// Tags forwarded to every worker
    pub tags: Vec<String>,

    /// Test name filter forwarded to every worker
    pub filter: Option<String>,

    /// Ask workers to collect coverage
    pub coverage_enabled: bool,

    /// Program that runs a test file
    pub interpreter: String,

    /// Arguments placed before the test file
    pub interpreter_args: Vec<String>,

    /// Directory for temporary worker output (system temp dir if unset)
    pub artifact_dir: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            timeout_seconds: 60,
            fail_fast: false,
            aggregate_coverage: false,
            show_worker_output: false,
            verbose: false,
            tags: Vec::new(),
            filter: None,
            coverage_enabled: false,
            interpreter: "sh".to_string(),
            interpreter_args: Vec::new(),
            artifact_dir: None,
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set worker count
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set per-file timeout
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_seconds = secs;
        self
    }

    pub fn fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    /// Enable coverage collection and aggregation together
    pub fn coverage(mut self, enabled: bool) -> Self {
        self.coverage_enabled = enabled;
        self.aggregate_coverage = enabled;
        self
    }

    pub fn show_worker_output(mut self, enabled: bool) -> Self {
        self.show_worker_output = enabled;
        self
    }

    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Add a tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn filter(mut self, pattern: impl Into<String>) -> Self {
        self.filter = Some(pattern.into());
        self
    }

    /// Set the worker program and its leading arguments
    pub fn interpreter<I, S>(mut self, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interpreter = program.into();
        self.interpreter_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), RunnerError> {
        if !(1..=MAX_WORKERS).contains(&self.workers) {
            return Err(RunnerError::Validation(format!(
                "workers must be between 1 and {MAX_WORKERS}, got {}",
                self.workers
            )));
        }
        if self.timeout_seconds < 1 {
            return Err(RunnerError::Validation(
                "timeout_seconds must be at least 1".to_string(),
            ));
        }
        if self.interpreter.trim().is_empty() {
            return Err(RunnerError::Validation(
                "interpreter must not be empty".to_string(),
            ));
        }
        if self.tags.iter().any(|t| t.trim().is_empty()) {
            return Err(RunnerError::Validation(
                "tags must not be empty".to_string(),
            ));
        }
        if matches!(&self.filter, Some(f) if f.is_empty()) {
            return Err(RunnerError::Validation(
                "filter must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment overrides (environment takes precedence)
    pub fn apply_env(mut self, env: &EnvConfig) -> Self {
        if let Some(workers) = env.workers {
            self.workers = workers;
        }
        if let Some(timeout) = env.timeout {
            self.timeout_seconds = timeout;
        }
        if let Some(fail_fast) = env.fail_fast {
            self.fail_fast = fail_fast;
        }
        if let Some(coverage) = env.coverage {
            self.coverage_enabled = coverage;
        }
        if let Some(aggregate) = env.aggregate_coverage {
            self.aggregate_coverage = aggregate;
        }
        if let Some(show) = env.show_output {
            self.show_worker_output = show;
        }
        if let Some(verbose) = env.verbose {
            self.verbose = verbose;
        }
        if let Some(interpreter) = &env.interpreter {
            self.interpreter = interpreter.clone();
        }
        if let Some(filter) = &env.filter {
            self.filter = Some(filter.clone());
        }
        if let Some(tags) = &env.tags {
            self.tags = tags.clone();
        }
        self
    }
}
