//! Error taxonomy for the test engine
//!
//! Only validation errors ever escape `run_tests`. Everything else is
//! recorded against the file that produced it.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::ErrorKind;

/// Errors raised while running test files
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("Worker artifact error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker exceeded {0}s timeout")]
    Timeout(u64),

    #[error("Worker process error: {0}")]
    Process(String),

    #[error("Malformed result payload: {0}")]
    Parse(String),
}

impl RunnerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RunnerError::Io {
            path: path.into(),
            source,
        }
    }

    /// Kind recorded on the per-file error list
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunnerError::Validation(_) | RunnerError::Process(_) => ErrorKind::Process,
            RunnerError::Io { .. } => ErrorKind::Io,
            RunnerError::Timeout(_) => ErrorKind::Timeout,
            RunnerError::Parse(_) => ErrorKind::Parse,
        }
    }
}
