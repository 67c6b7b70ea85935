//! Data models for the test engine
//!
//! Per-worker results, the run-wide aggregate, and coverage records.

mod aggregate;
mod coverage;
mod worker_result;

pub use aggregate::{AggregateResult, FileError, WorkerOutput};
pub use coverage::{CoverageMap, CoverageSummary, FileCoverage};
pub use worker_result::{ErrorKind, TestError, WorkerResult};
