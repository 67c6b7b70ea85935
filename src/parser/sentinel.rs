//! Sentinel result protocol
//!
//! Workers print one JSON object between `RESULTS_JSON_BEGIN` and
//! `RESULTS_JSON_END`. If several blocks appear, the last well-formed one
//! wins.

use serde::Deserialize;
use tracing::warn;

use super::heuristic::strip_ansi;
use crate::error::RunnerError;
use crate::models::{CoverageMap, TestError, WorkerResult};

pub const RESULTS_BEGIN: &str = "RESULTS_JSON_BEGIN";
pub const RESULTS_END: &str = "RESULTS_JSON_END";

/// Payload carried inside the sentinel block
#[derive(Debug, Deserialize)]
pub(super) struct ResultPayload {
    total: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
    pending: usize,
    #[serde(default)]
    errors: Vec<TestError>,
    #[serde(default)]
    elapsed: Option<f64>,
    #[serde(default)]
    coverage: Option<CoverageMap>,
}

impl ResultPayload {
    pub(super) fn into_result(
        self,
        raw_output: &str,
        measured: f64,
        success: bool,
    ) -> WorkerResult {
        let counted = self.passed + self.failed + self.skipped + self.pending;
        if self.total != counted {
            warn!(
                "Result payload total {} does not match counts {}, using counts",
                self.total, counted
            );
        }

        let elapsed = match self.elapsed {
            Some(secs) if secs.is_finite() && secs >= 0.0 => secs,
            _ => measured.max(0.0),
        };

        WorkerResult {
            total: counted,
            passed: self.passed,
            failed: self.failed,
            skipped: self.skipped,
            pending: self.pending,
            errors: self.errors,
            elapsed,
            success: success && self.failed == 0,
            raw_output: raw_output.to_string(),
            coverage: self.coverage,
        }
    }
}

/// Find and decode the last well-formed sentinel block
pub(super) fn extract(raw_output: &str) -> Result<ResultPayload, RunnerError> {
    let mut found = None;
    let mut last_error = None;
    let mut rest = raw_output;

    while let Some(begin) = rest.find(RESULTS_BEGIN) {
        let body_start = begin + RESULTS_BEGIN.len();
        let Some(len) = rest[body_start..].find(RESULTS_END) else {
            last_error = Some(RunnerError::Parse("unterminated result block".into()));
            break;
        };

        let body = strip_ansi(&rest[body_start..body_start + len]);
        match serde_json::from_str::<ResultPayload>(body.trim()) {
            Ok(payload) => found = Some(payload),
            Err(e) => last_error = Some(RunnerError::Parse(e.to_string())),
        }
        rest = &rest[body_start + len + RESULTS_END.len()..];
    }

    match (found, last_error) {
        (Some(payload), _) => Ok(payload),
        (None, Some(e)) => Err(e),
        (None, None) => Err(RunnerError::Parse("no result block".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(json: &str) -> String {
        format!("{RESULTS_BEGIN}\n{json}\n{RESULTS_END}\n")
    }

    #[test]
    fn test_extract_missing_block() {
        let err = extract("PASS something").unwrap_err();
        assert!(matches!(err, RunnerError::Parse(_)));
    }

    #[test]
    fn test_extract_unterminated() {
        let raw = format!("{RESULTS_BEGIN}\n{{\"total\": 0}}");
        let err = extract(&raw).unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn test_missing_required_field_is_malformed() {
        let raw = block(r#"{"total": 1, "passed": 1}"#);
        assert!(extract(&raw).is_err());
    }

    #[test]
    fn test_last_good_block_wins() {
        let raw = format!(
            "{}{}{}",
            block(r#"{"total":1,"passed":1,"failed":0,"skipped":0,"pending":0}"#),
            block(r#"{"total":2,"passed":2,"failed":0,"skipped":0,"pending":0}"#),
            block("not json"),
        );
        let result = extract(&raw).unwrap().into_result(&raw, 0.0, true);
        assert_eq!(result.passed, 2);
        assert!(result.success);
    }

    #[test]
    fn test_total_is_recomputed() {
        let raw = block(r#"{"total":9,"passed":1,"failed":1,"skipped":0,"pending":0}"#);
        let result = extract(&raw).unwrap().into_result(&raw, 0.5, true);
        assert_eq!(result.total, 2);
        assert!(result.is_consistent());
        assert!(!result.success);
        assert_eq!(result.elapsed, 0.5);
    }

    #[test]
    fn test_block_with_ansi_and_coverage() {
        let raw = block(
            "\x1b[0m{\"total\":1,\"passed\":1,\"failed\":0,\"skipped\":0,\"pending\":0,\
             \"elapsed\":0.2,\"coverage\":{\"lib.lua\":{\"lines\":{\"3\":4}}}}",
        );
        let result = extract(&raw).unwrap().into_result(&raw, 1.0, true);
        let coverage = result.coverage.unwrap();
        assert_eq!(coverage.get("lib.lua").unwrap().lines.get(&3), Some(&4));
        assert_eq!(result.elapsed, 0.2);
    }

    #[test]
    fn test_negative_elapsed_uses_measured() {
        let raw = block(r#"{"total":0,"passed":0,"failed":0,"skipped":0,"pending":0,"elapsed":-3}"#);
        let result = extract(&raw).unwrap().into_result(&raw, 0.75, true);
        assert_eq!(result.elapsed, 0.75);
    }
}
