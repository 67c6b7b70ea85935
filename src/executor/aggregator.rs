//! Result aggregation
//!
//! Folds worker results into the run-wide [`AggregateResult`]. Only the
//! scheduler's coordinating task calls into this, so it needs no locking.

use chrono::Utc;
use std::time::Duration;

use crate::config::RunConfig;
use crate::coverage;
use crate::models::{AggregateResult, FileError, WorkerOutput, WorkerResult};

/// Owns the aggregate for one run
#[derive(Debug)]
pub struct ResultAggregator {
    result: AggregateResult,
    aggregate_coverage: bool,
    keep_output: bool,
}

impl ResultAggregator {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            result: AggregateResult::new(),
            aggregate_coverage: config.aggregate_coverage,
            keep_output: config.show_worker_output,
        }
    }

    /// Apply one worker's result
    pub fn add(&mut self, file: &str, worker: WorkerResult) {
        let result = &mut self.result;

        result.total += worker.counted();
        result.passed += worker.passed;
        result.failed += worker.failed;
        result.skipped += worker.skipped;
        result.pending += worker.pending;
        result.elapsed += worker.elapsed.max(0.0);
        result.files_run.push(file.to_string());

        if !worker.success {
            result.failed_files.push(file.to_string());
        }

        result
            .errors
            .extend(worker.errors.into_iter().map(|error| FileError {
                file: file.to_string(),
                message: error.message,
                traceback: error.traceback,
                kind: error.kind,
            }));

        if self.aggregate_coverage {
            if let Some(file_map) = &worker.coverage {
                coverage::merge(&mut result.coverage, file_map);
            }
        }

        if self.keep_output {
            result.worker_outputs.push(WorkerOutput {
                file: file.to_string(),
                output: worker.raw_output,
            });
        }
    }

    /// Stamp completion and hand the aggregate to the caller
    pub fn finish(mut self, wall_clock: Duration) -> AggregateResult {
        self.result.wall_clock = wall_clock.as_secs_f64();
        self.result.finished_at = Some(Utc::now());
        self.result
    }
}
