//! Bounded parallel dispatch of test files
//!
//! Keeps up to `workers` launches in flight, feeds completed results to the
//! aggregator in dispatch order, and stops dispatching on the first failure
//! when fail-fast is set.

use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::aggregator::ResultAggregator;
use super::launcher::{LaunchOutcome, WorkerLaunch, WorkerLauncher};
use crate::config::RunConfig;
use crate::error::RunnerError;
use crate::models::{AggregateResult, ErrorKind, TestError, WorkerResult};
use crate::parser::{self, ParseSource};

/// Dispatches test files over a bounded pool of worker slots
pub struct Scheduler<L = WorkerLauncher> {
    launcher: L,
    config: RunConfig,
}

impl Scheduler<WorkerLauncher> {
    /// Scheduler that runs each file as an OS process
    pub fn with_processes(config: RunConfig) -> Result<Self, RunnerError> {
        Self::new(WorkerLauncher::new(), config)
    }
}

impl<L: WorkerLaunch> Scheduler<L> {
    pub fn new(launcher: L, config: RunConfig) -> Result<Self, RunnerError> {
        config.validate()?;
        Ok(Self { launcher, config })
    }

    /// Run every file (or, under fail-fast, every file dispatched before the
    /// first failure) and return the aggregate
    pub async fn run(&self, files: &[String]) -> AggregateResult {
        let started = Instant::now();
        let workers = self.config.workers;
        let mut aggregator = ResultAggregator::new(&self.config);

        info!(
            "Running {} test files with {} workers (timeout {}s)",
            files.len(),
            workers,
            self.config.timeout_seconds
        );

        let mut in_flight = FuturesUnordered::new();
        let mut cursor = 0;
        let mut halted = false;
        // completed results waiting for earlier dispatches to finish
        let mut completed: BTreeMap<usize, WorkerResult> = BTreeMap::new();
        let mut next_to_apply = 0;

        loop {
            while !halted && cursor < files.len() && in_flight.len() < workers {
                let index = cursor;
                let file = files[index].as_str();
                cursor += 1;

                debug!("Dispatching {} ({}/{})", file, index + 1, files.len());
                in_flight.push(async move {
                    let outcome = self.launcher.launch(file, &self.config).await;
                    (index, settle(file, outcome, &self.config))
                });
            }

            let Some((index, result)) = in_flight.next().await else {
                break;
            };

            self.log_completion(&files[index], &result);

            if self.config.fail_fast && !result.success && !halted {
                halted = true;
                let skipped = files.len() - cursor;
                if skipped > 0 {
                    warn!(
                        "Fail-fast: {} failed, not starting {} remaining files",
                        files[index], skipped
                    );
                }
            }

            completed.insert(index, result);
            while let Some(result) = completed.remove(&next_to_apply) {
                aggregator.add(&files[next_to_apply], result);
                next_to_apply += 1;
            }
        }

        let result = aggregator.finish(started.elapsed());
        info!(
            "Run finished in {:.2}s: {} ({} of {} files run)",
            result.wall_clock,
            result,
            result.files_run.len(),
            files.len()
        );
        result
    }

    fn log_completion(&self, file: &str, result: &WorkerResult) {
        let status = if result.success { "ok" } else { "FAILED" };
        if self.config.verbose {
            info!("{} {}: {}", status, file, result);
            if !result.success && !result.raw_output.is_empty() {
                info!("Output of {}:\n{}", file, result.raw_output);
            }
        } else {
            debug!("{} {}: {}", status, file, result);
        }
    }
}

/// Turn a launch outcome into the file's final result
///
/// Engine-side problems (timeout, spawn or artifact failure, unreadable
/// output) become errors on the result and mark it unsuccessful.
pub fn settle(file: &str, outcome: LaunchOutcome, config: &RunConfig) -> WorkerResult {
    let (mut result, source) =
        parser::parse_with_source(&outcome.raw_output, outcome.elapsed, outcome.success);

    if outcome.timed_out {
        let error = RunnerError::Timeout(config.timeout_seconds);
        result.fail_with(TestError::new(error.to_string()).with_kind(error.kind()));
    }

    match outcome.error {
        Some(error) => {
            warn!("Worker for {} failed: {}", file, error);
            result.fail_with(TestError::new(error.to_string()).with_kind(error.kind()));
        }
        None if source == ParseSource::NoSignal && !outcome.timed_out => {
            debug!("No test results recognized in output of {}", file);
            result.fail_with(
                TestError::new("no test results found in worker output")
                    .with_kind(ErrorKind::Parse),
            );
        }
        None => {}
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::{BoxFuture, FutureExt};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::models::FileError;

    /// Scripted launch: output, exit status, and a delay before completing
    #[derive(Clone)]
    struct Script {
        output: String,
        success: bool,
        elapsed: f64,
        delay_ms: u64,
        timed_out: bool,
    }

    fn sentinel(passed: usize, failed: usize, errors: &str) -> String {
        format!(
            "RESULTS_JSON_BEGIN\n{{\"total\":{},\"passed\":{},\"failed\":{},\"skipped\":0,\
             \"pending\":0,\"errors\":[{}],\"elapsed\":0.5}}\nRESULTS_JSON_END\n",
            passed + failed,
            passed,
            failed,
            errors
        )
    }

    fn passing(passed: usize) -> Script {
        Script {
            output: sentinel(passed, 0, ""),
            success: true,
            elapsed: 0.5,
            delay_ms: 0,
            timed_out: false,
        }
    }

    fn failing(message: &str) -> Script {
        Script {
            output: sentinel(0, 1, &format!("{{\"message\":\"{message}\"}}")),
            success: false,
            elapsed: 0.5,
            delay_ms: 0,
            timed_out: false,
        }
    }

    fn delayed(mut script: Script, delay_ms: u64) -> Script {
        script.delay_ms = delay_ms;
        script
    }

    #[derive(Default)]
    struct FakeLauncher {
        scripts: HashMap<String, Script>,
        launched: Mutex<Vec<String>>,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeLauncher {
        fn new(scripts: &[(&str, Script)]) -> Self {
            Self {
                scripts: scripts
                    .iter()
                    .map(|(f, s)| (f.to_string(), s.clone()))
                    .collect(),
                ..Default::default()
            }
        }

        fn launched(&self) -> Vec<String> {
            self.launched.lock().unwrap().clone()
        }
    }

    impl WorkerLaunch for FakeLauncher {
        fn launch<'a>(
            &'a self,
            file: &'a str,
            _config: &'a RunConfig,
        ) -> BoxFuture<'a, LaunchOutcome> {
            async move {
                self.launched.lock().unwrap().push(file.to_string());
                let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);

                let script = self.scripts.get(file).cloned().unwrap_or_else(|| passing(1));
                tokio::time::sleep(Duration::from_millis(script.delay_ms)).await;
                self.running.fetch_sub(1, Ordering::SeqCst);

                LaunchOutcome {
                    raw_output: script.output,
                    elapsed: script.elapsed,
                    success: script.success,
                    timed_out: script.timed_out,
                    exit_code: Some(if script.success { 0 } else { 1 }),
                    error: None,
                }
            }
            .boxed()
        }
    }

    fn files(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    async fn run(
        launcher: FakeLauncher,
        config: RunConfig,
        names: &[&str],
    ) -> (AggregateResult, FakeLauncher) {
        let scheduler = Scheduler::new(launcher, config).unwrap();
        let result = scheduler.run(&files(names)).await;
        (result, scheduler.launcher)
    }

    #[test]
    fn test_empty_file_list() {
        let scheduler = Scheduler::new(FakeLauncher::default(), RunConfig::default()).unwrap();
        let result = tokio_test::block_on(scheduler.run(&[]));
        assert_eq!(result.total, 0);
        assert_eq!(result.passed, 0);
        assert!(result.files_run.is_empty());
        assert!(result.errors.is_empty());
        assert_eq!(result.elapsed, 0.0);
        assert!(result.is_success());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let err = Scheduler::new(FakeLauncher::default(), RunConfig::new().workers(0));
        assert!(matches!(err, Err(RunnerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_two_passing_files() {
        let launcher = FakeLauncher::new(&[("t1", passing(3)), ("t2", passing(3))]);
        let (result, _) = run(launcher, RunConfig::new().workers(2), &["t1", "t2"]).await;

        assert_eq!(result.total, 6);
        assert_eq!(result.passed, 6);
        assert_eq!(result.failed, 0);
        assert_eq!(result.files_run, vec!["t1", "t2"]);
        assert!(result.is_success());
        assert!(result.is_clean());
    }

    #[tokio::test]
    async fn test_failure_recorded_without_fail_fast() {
        let launcher = FakeLauncher::new(&[("a", failing("boom")), ("b", passing(2))]);
        let (result, launcher) = run(launcher, RunConfig::new().workers(2), &["a", "b"]).await;

        assert_eq!(launcher.launched().len(), 2);
        assert_eq!(result.files_run, vec!["a", "b"]);
        assert_eq!(result.failed, 1);
        assert_eq!(
            result.errors,
            vec![FileError {
                file: "a".into(),
                message: "boom".into(),
                traceback: None,
                kind: ErrorKind::Test,
            }]
        );
        assert!(!result.is_success());
        assert_eq!(result.failed_files, vec!["a"]);
    }

    #[tokio::test]
    async fn test_fail_fast_sequential() {
        let launcher = FakeLauncher::new(&[
            ("A", failing("nope")),
            ("B", passing(1)),
            ("C", passing(1)),
        ]);
        let config = RunConfig::new().workers(1).fail_fast(true);
        let (result, launcher) = run(launcher, config, &["A", "B", "C"]).await;

        assert_eq!(result.files_run, vec!["A"]);
        assert_eq!(launcher.launched(), vec!["A"]);
        assert_eq!(result.total, 1);
        assert_eq!(result.failed, 1);
    }

    #[tokio::test]
    async fn test_fail_fast_lets_in_flight_finish() {
        let launcher = FakeLauncher::new(&[
            ("slow", delayed(passing(4), 100)),
            ("bad", failing("x")),
            ("never", passing(1)),
        ]);
        let config = RunConfig::new().workers(2).fail_fast(true);
        let (result, launcher) = run(launcher, config, &["slow", "bad", "never"]).await;

        assert_eq!(launcher.launched().len(), 2);
        assert_eq!(result.files_run, vec!["slow", "bad"]);
        assert_eq!(result.passed, 4);
        assert_eq!(result.failed, 1);
    }

    #[tokio::test]
    async fn test_bounded_concurrency() {
        let scripts: Vec<(String, Script)> = (0..10)
            .map(|i| (format!("f{i}"), delayed(passing(1), 20)))
            .collect();
        let refs: Vec<(&str, Script)> = scripts
            .iter()
            .map(|(f, s)| (f.as_str(), s.clone()))
            .collect();
        let names: Vec<&str> = scripts.iter().map(|(f, _)| f.as_str()).collect();

        let config = RunConfig::new().workers(3);
        let (result, launcher) = run(FakeLauncher::new(&refs), config, &names).await;

        assert_eq!(result.files_run.len(), 10);
        assert_eq!(result.passed, 10);
        let peak = launcher.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {peak} exceeded 3 workers");
        assert!(peak > 1, "workers never overlapped");
    }

    #[tokio::test]
    async fn test_completion_order_does_not_change_aggregate() {
        let names = ["a", "b", "c"];
        let fast_first = FakeLauncher::new(&[
            ("a", delayed(passing(2), 60)),
            ("b", delayed(failing("b broke"), 30)),
            ("c", delayed(passing(5), 0)),
        ]);
        let slow_first = FakeLauncher::new(&[
            ("a", delayed(passing(2), 0)),
            ("b", delayed(failing("b broke"), 30)),
            ("c", delayed(passing(5), 60)),
        ]);

        let config = RunConfig::new().workers(3);
        let (first, _) = run(fast_first, config.clone(), &names).await;
        let (second, _) = run(slow_first, config, &names).await;

        assert_eq!(
            (first.total, first.passed, first.failed),
            (second.total, second.passed, second.failed)
        );
        assert_eq!(first.errors, second.errors);
        assert!((first.elapsed - second.elapsed).abs() < 1e-9);
        // applied in dispatch order regardless of completion
        assert_eq!(first.files_run, vec!["a", "b", "c"]);
        assert_eq!(second.files_run, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_elapsed_is_sum_of_workers() {
        let launcher = FakeLauncher::new(&[
            ("a", passing(1)),
            ("b", passing(1)),
            ("c", passing(1)),
        ]);
        let (result, _) = run(launcher, RunConfig::new().workers(3), &["a", "b", "c"]).await;
        assert!((result.elapsed - 1.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_timed_out_worker_recorded() {
        let hung = Script {
            output: "PASS first\n".to_string(),
            success: false,
            elapsed: 1.0,
            delay_ms: 0,
            timed_out: true,
        };
        let launcher = FakeLauncher::new(&[("hung", hung), ("ok", passing(1))]);
        let config = RunConfig::new().workers(2).timeout(1);
        let (result, _) = run(launcher, config, &["hung", "ok"]).await;

        assert_eq!(result.files_run, vec!["hung", "ok"]);
        assert_eq!(result.failed_files, vec!["hung"]);
        assert_eq!(result.passed, 2);
        let errors: Vec<_> = result.errors_for("hung").collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Timeout);
        assert!(!result.is_clean());
    }

    #[test]
    fn test_settle_no_signal_is_failure() {
        let outcome = LaunchOutcome {
            raw_output: "nothing useful".to_string(),
            elapsed: 0.2,
            success: true,
            timed_out: false,
            exit_code: Some(0),
            error: None,
        };
        let result = settle("quiet", outcome, &RunConfig::default());
        assert_eq!(result.total, 0);
        assert!(!result.success);
        assert_eq!(result.errors[0].kind, ErrorKind::Parse);
    }

    #[test]
    fn test_settle_spawn_failure() {
        let outcome =
            LaunchOutcome::failed(RunnerError::Process("failed to spawn lua".into()), 0.0);
        let result = settle("a", outcome, &RunConfig::default());
        assert!(!result.success);
        assert!(result.raw_output.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::Process);
        assert!(result.errors[0].message.contains("failed to spawn lua"));
    }
}
