//! Result of one worker process
//!
//! Defines the per-file result and the errors a worker can report.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::CoverageMap;

/// Category of a recorded error
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Failure reported by the test code itself
    #[default]
    Test,
    Timeout,
    Process,
    Io,
    Parse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Test => write!(f, "test"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Process => write!(f, "process"),
            ErrorKind::Io => write!(f, "io"),
            ErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// A single error reported for a test file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestError {
    pub message: String,
    #[serde(default)]
    pub traceback: Option<String>,
    #[serde(default)]
    pub kind: ErrorKind,
}

impl TestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            traceback: None,
            kind: ErrorKind::Test,
        }
    }

    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = Some(traceback.into());
        self
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Structured outcome of running one test file
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WorkerResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pending: usize,
    pub errors: Vec<TestError>,
    /// Seconds spent in the worker
    pub elapsed: f64,
    pub success: bool,
    #[serde(skip)]
    pub raw_output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageMap>,
}

impl WorkerResult {
    /// Zero-count result, used when nothing could be recovered from the output
    pub fn empty(raw_output: impl Into<String>, elapsed: f64, success: bool) -> Self {
        Self {
            elapsed: elapsed.max(0.0),
            success,
            raw_output: raw_output.into(),
            ..Default::default()
        }
    }

    /// Sum of the per-status counts
    pub fn counted(&self) -> usize {
        self.passed + self.failed + self.skipped + self.pending
    }

    pub fn is_consistent(&self) -> bool {
        self.total == self.counted()
    }

    /// Whether any test outcome or error was recovered
    pub fn has_signal(&self) -> bool {
        self.counted() > 0 || !self.errors.is_empty()
    }

    /// Record an engine-side error and mark the file as failed
    pub fn fail_with(&mut self, error: TestError) {
        self.errors.push(error);
        self.success = false;
    }
}

impl fmt::Display for WorkerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} total, {} passed, {} failed, {} skipped, {} pending [{:.2}s]",
            self.total, self.passed, self.failed, self.skipped, self.pending, self.elapsed
        )
    }
}
