//! Run-wide aggregate result
//!
//! Accumulated counts, errors and coverage across every dispatched file.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::{CoverageMap, ErrorKind};

/// An error tagged with the file that produced it
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub file: String,
    pub message: String,
    pub traceback: Option<String>,
    pub kind: ErrorKind,
}

/// Captured output of one worker
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WorkerOutput {
    pub file: String,
    pub output: String,
}

/// Aggregate of all worker results in a run
#[derive(Clone, Debug, Serialize)]
pub struct AggregateResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pending: usize,
    pub errors: Vec<FileError>,
    /// Sum of per-file elapsed seconds
    pub elapsed: f64,
    pub files_run: Vec<String>,
    /// Files whose worker finished unsuccessfully
    pub failed_files: Vec<String>,
    #[serde(skip_serializing_if = "CoverageMap::is_empty")]
    pub coverage: CoverageMap,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub worker_outputs: Vec<WorkerOutput>,
    /// Wall-clock seconds for the whole run
    pub wall_clock: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl AggregateResult {
    pub fn new() -> Self {
        Self {
            total: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            pending: 0,
            errors: Vec::new(),
            elapsed: 0.0,
            files_run: Vec::new(),
            failed_files: Vec::new(),
            coverage: CoverageMap::new(),
            worker_outputs: Vec::new(),
            wall_clock: 0.0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Overall success: no failing tests
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// No failing tests and no worker ended unsuccessfully
    pub fn is_clean(&self) -> bool {
        self.is_success() && self.failed_files.is_empty()
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    /// Errors reported for one file
    pub fn errors_for<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a FileError> + 'a {
        self.errors.iter().filter(move |e| e.file == file)
    }
}

impl Default for AggregateResult {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AggregateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files | Total: {} | Pass: {} | Fail: {} | Skip: {} | Pending: {} | {:.2}s",
            self.files_run.len(),
            self.total,
            self.passed,
            self.failed,
            self.skipped,
            self.pending,
            self.elapsed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_aggregate_is_empty() {
        let aggregate = AggregateResult::new();
        assert_eq!(aggregate.total, 0);
        assert!(aggregate.files_run.is_empty());
        assert!(aggregate.is_success());
        assert!(aggregate.is_clean());
        assert_eq!(aggregate.pass_rate(), 0.0);
    }

    #[test]
    fn test_clean_requires_no_failed_files() {
        let mut aggregate = AggregateResult::new();
        aggregate.failed_files.push("slow.lua".into());
        assert!(aggregate.is_success());
        assert!(!aggregate.is_clean());
    }

    #[test]
    fn test_errors_for() {
        let mut aggregate = AggregateResult::new();
        for file in ["a", "b", "a"] {
            aggregate.errors.push(FileError {
                file: file.into(),
                message: "boom".into(),
                traceback: None,
                kind: ErrorKind::Test,
            });
        }
        assert_eq!(aggregate.errors_for("a").count(), 2);
        assert_eq!(aggregate.errors_for("c").count(), 0);
    }
}
