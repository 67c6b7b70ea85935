//! Test execution engine
//!
//! Launches worker processes, schedules them over a bounded pool, and
//! aggregates their results.

mod aggregator;
mod launcher;
mod scheduler;

pub use aggregator::ResultAggregator;
pub use launcher::{LaunchOutcome, WorkerCommand, WorkerLaunch, WorkerLauncher, RESULTS_FORMAT};
pub use scheduler::{settle, Scheduler};
