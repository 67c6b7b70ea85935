//! testfleet - parallel test-file runner
//!
//! Runs each test file in its own worker process, bounded by a pool of
//! `workers` slots, and folds the results into one [`AggregateResult`].
//!
//! ## Worker contract
//!
//! Each file is run as
//!
//! ```text
//! <interpreter> <file> [--coverage] [--tag <t>]* [--filter <pattern>] --results-format sentinel-json
//! ```
//!
//! and is expected to print its results as JSON between the
//! `RESULTS_JSON_BEGIN` and `RESULTS_JSON_END` markers. Workers that do not
//! are scored from their plain-text `PASS`/`FAIL`/`SKIP`/`PENDING` lines.
//!
//! ## Usage
//!
//! ```no_run
//! # async fn demo() -> Result<(), testfleet::RunnerError> {
//! use testfleet::{run_tests, RunConfig};
//!
//! let files = vec!["spec/a_spec.lua".to_string(), "spec/b_spec.lua".to_string()];
//! let config = RunConfig::new().workers(2).interpreter("busted", Vec::<String>::new());
//! let result = run_tests(&files, &config).await?;
//! println!("{result}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coverage;
pub mod error;
pub mod executor;
pub mod models;
pub mod output;
pub mod parser;
pub mod utils;

pub use config::RunConfig;
pub use error::RunnerError;
pub use executor::Scheduler;
pub use models::{AggregateResult, CoverageMap, FileError, WorkerResult};

/// Run `files` in worker processes and aggregate the results
///
/// Fails only when `config` is invalid; per-file failures are recorded in
/// the returned aggregate.
pub async fn run_tests(
    files: &[String],
    config: &RunConfig,
) -> Result<AggregateResult, RunnerError> {
    let scheduler = Scheduler::with_processes(config.clone())?;
    Ok(scheduler.run(files).await)
}
