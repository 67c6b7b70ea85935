//! Worker process launching
//!
//! Runs one test file in its own process under a deadline. Combined
//! stdout/stderr goes to a temporary artifact that is read back and deleted
//! before the launch returns.

use futures::future::{BoxFuture, FutureExt};
use std::process::Stdio;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::RunConfig;
use crate::error::RunnerError;
use crate::utils::Timer;

/// Value of `--results-format` requesting the sentinel protocol
pub const RESULTS_FORMAT: &str = "sentinel-json";

const ARTIFACT_PREFIX: &str = "testfleet-worker-";

/// Argument list for one worker invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl WorkerCommand {
    /// Build the worker argv for `file`
    ///
    /// `<interpreter> [interpreter_args] <file> [--coverage] [--tag <t>]*
    /// [--filter <pattern>] --results-format sentinel-json`
    pub fn build(file: &str, config: &RunConfig) -> Self {
        let mut args = config.interpreter_args.clone();
        args.push(file.to_string());

        if config.coverage_enabled {
            args.push("--coverage".to_string());
        }
        for tag in &config.tags {
            args.push("--tag".to_string());
            args.push(tag.clone());
        }
        if let Some(filter) = &config.filter {
            args.push("--filter".to_string());
            args.push(filter.clone());
        }
        args.push("--results-format".to_string());
        args.push(RESULTS_FORMAT.to_string());

        Self {
            program: config.interpreter.clone(),
            args,
        }
    }

    /// Full argv including the program
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

/// What happened when a worker ran
#[derive(Debug)]
pub struct LaunchOutcome {
    pub raw_output: String,
    /// Wall-clock seconds of the invocation
    pub elapsed: f64,
    pub success: bool,
    pub timed_out: bool,
    pub exit_code: Option<i32>,
    /// Spawn, wait, or artifact failure
    pub error: Option<RunnerError>,
}

impl LaunchOutcome {
    /// A launch that produced no output because of `error`
    pub fn failed(error: RunnerError, elapsed: f64) -> Self {
        Self {
            raw_output: String::new(),
            elapsed,
            success: false,
            timed_out: false,
            exit_code: None,
            error: Some(error),
        }
    }
}

/// Something that can run a single test file
pub trait WorkerLaunch: Send + Sync {
    fn launch<'a>(&'a self, file: &'a str, config: &'a RunConfig) -> BoxFuture<'a, LaunchOutcome>;
}

/// Launches each test file as an OS process
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkerLauncher;

impl WorkerLauncher {
    pub fn new() -> Self {
        Self
    }

    /// Run one test file to completion or deadline
    pub async fn run(&self, file: &str, config: &RunConfig) -> LaunchOutcome {
        let command = WorkerCommand::build(file, config);
        let timer = Timer::start(format!("worker {file}"));

        let artifact = match create_artifact(config) {
            Ok(artifact) => artifact,
            Err(e) => return LaunchOutcome::failed(e, timer.stop()),
        };

        let mut outcome = execute(&command, &artifact, config.timeout_seconds).await;
        outcome.elapsed = timer.stop();

        match tokio::fs::read(artifact.path()).await {
            Ok(bytes) => outcome.raw_output = String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                outcome.success = false;
                if outcome.error.is_none() {
                    outcome.error = Some(RunnerError::io(artifact.path(), e));
                }
            }
        }

        let path = artifact.path().to_path_buf();
        if let Err(e) = artifact.close() {
            warn!("Failed to remove worker artifact {}: {}", path.display(), e);
        }

        outcome
    }
}

impl WorkerLaunch for WorkerLauncher {
    fn launch<'a>(&'a self, file: &'a str, config: &'a RunConfig) -> BoxFuture<'a, LaunchOutcome> {
        self.run(file, config).boxed()
    }
}

/// Create the scoped output artifact for one worker
fn create_artifact(config: &RunConfig) -> Result<NamedTempFile, RunnerError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(ARTIFACT_PREFIX).suffix(".out");

    match &config.artifact_dir {
        Some(dir) => builder
            .tempfile_in(dir)
            .map_err(|e| RunnerError::io(dir, e)),
        None => builder
            .tempfile()
            .map_err(|e| RunnerError::io(std::env::temp_dir(), e)),
    }
}

/// Spawn the worker with output redirected to `artifact` and wait for it
async fn execute(
    command: &WorkerCommand,
    artifact: &NamedTempFile,
    timeout_secs: u64,
) -> LaunchOutcome {
    // Both handles share one file offset so interleaved writes never overlap
    let (stdout, stderr) = match artifact
        .as_file()
        .try_clone()
        .and_then(|out| Ok((out, artifact.as_file().try_clone()?)))
    {
        Ok(handles) => handles,
        Err(e) => return LaunchOutcome::failed(RunnerError::io(artifact.path(), e), 0.0),
    };

    debug!("Spawning worker: {}", command.argv().join(" "));

    let mut child = match Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            return LaunchOutcome::failed(
                RunnerError::Process(format!("failed to spawn {}: {}", command.program, e)),
                0.0,
            )
        }
    };

    let waited = tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait()).await;
    match waited {
        Ok(Ok(status)) => LaunchOutcome {
            raw_output: String::new(),
            elapsed: 0.0,
            success: status.success(),
            timed_out: false,
            exit_code: status.code(),
            error: None,
        },
        Ok(Err(e)) => LaunchOutcome::failed(
            RunnerError::Process(format!("failed to wait for {}: {}", command.program, e)),
            0.0,
        ),
        Err(_) => {
            warn!(
                "Worker exceeded {}s timeout, killing: {}",
                timeout_secs,
                command.argv().join(" ")
            );
            if let Err(e) = child.kill().await {
                warn!("Failed to kill timed out worker: {}", e);
            }
            LaunchOutcome {
                raw_output: String::new(),
                elapsed: 0.0,
                success: false,
                timed_out: true,
                exit_code: None,
                error: None,
            }
        }
    }
}
