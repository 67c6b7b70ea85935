//! Worker output parsing
//!
//! Turns the captured text of a worker into a [`WorkerResult`]. The
//! structured sentinel block is preferred; when it is missing or malformed
//! the plain-text status lines are scanned instead. Parsing never fails.

mod heuristic;
mod sentinel;

pub use heuristic::strip_ansi;
pub use sentinel::{RESULTS_BEGIN, RESULTS_END};

use tracing::debug;

use crate::models::WorkerResult;

/// Which tier produced a parsed result
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseSource {
    /// Well-formed sentinel payload
    Sentinel,
    /// Recognized status lines in plain text
    Heuristic,
    /// Nothing recognizable in the output
    NoSignal,
}

/// Parse captured worker output
pub fn parse(raw_output: &str, elapsed: f64, success: bool) -> WorkerResult {
    parse_with_source(raw_output, elapsed, success).0
}

/// Parse captured worker output, reporting which tier matched
///
/// `success` is the process exit status; a result is only successful when
/// the process succeeded and no test failed.
pub fn parse_with_source(
    raw_output: &str,
    elapsed: f64,
    success: bool,
) -> (WorkerResult, ParseSource) {
    match sentinel::extract(raw_output) {
        Ok(payload) => {
            let result = payload.into_result(raw_output, elapsed, success);
            return (result, ParseSource::Sentinel);
        }
        Err(e) => debug!("Falling back to line heuristics: {}", e),
    }

    let result = heuristic::scan(raw_output, elapsed, success);
    if result.has_signal() {
        (result, ParseSource::Heuristic)
    } else {
        (
            WorkerResult::empty(raw_output, elapsed, success),
            ParseSource::NoSignal,
        )
    }
}
