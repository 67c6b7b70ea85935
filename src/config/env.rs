//! Environment variable configuration
//!
//! Provides environment variable overrides for the run configuration.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "TESTFLEET";

/// Overrides read from TESTFLEET_* variables
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvConfig {
    /// Worker count from TESTFLEET_WORKERS
    pub workers: Option<usize>,
    /// Timeout from TESTFLEET_TIMEOUT
    pub timeout: Option<u64>,
    /// Fail-fast from TESTFLEET_FAIL_FAST
    pub fail_fast: Option<bool>,
    /// Coverage collection from TESTFLEET_COVERAGE
    pub coverage: Option<bool>,
    /// Coverage aggregation from TESTFLEET_AGGREGATE_COVERAGE
    pub aggregate_coverage: Option<bool>,
    /// Worker output retention from TESTFLEET_SHOW_OUTPUT
    pub show_output: Option<bool>,
    /// Verbose from TESTFLEET_VERBOSE
    pub verbose: Option<bool>,
    /// Interpreter from TESTFLEET_INTERPRETER
    pub interpreter: Option<String>,
    /// Filter from TESTFLEET_FILTER
    pub filter: Option<String>,
    /// Comma separated tags from TESTFLEET_TAGS
    pub tags: Option<Vec<String>>,
    /// Config file from TESTFLEET_CONFIG
    pub config_file: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self::from_lookup(|name| env::var(format!("{ENV_PREFIX}_{name}")).ok())
    }

    /// Load using a custom lookup of unprefixed variable names
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            workers: parse("WORKERS").and_then(|v| v.trim().parse().ok()),
            timeout: parse("TIMEOUT").and_then(|v| v.trim().parse().ok()),
            fail_fast: parse("FAIL_FAST").map(|v| parse_bool(&v)),
            coverage: parse("COVERAGE").map(|v| parse_bool(&v)),
            aggregate_coverage: parse("AGGREGATE_COVERAGE").map(|v| parse_bool(&v)),
            show_output: parse("SHOW_OUTPUT").map(|v| parse_bool(&v)),
            verbose: parse("VERBOSE").map(|v| parse_bool(&v)),
            interpreter: parse("INTERPRETER"),
            filter: parse("FILTER"),
            tags: parse("TAGS").map(|v| split_list(&v)),
            config_file: parse("CONFIG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        *self != Self::default()
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enabled"
    )
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Print all TESTFLEET environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_WORKERS             Concurrent worker processes (1-64)");
    println!("  {ENV_PREFIX}_TIMEOUT             Per-file timeout in seconds");
    println!("  {ENV_PREFIX}_FAIL_FAST           Stop after the first failing file (true/false)");
    println!("  {ENV_PREFIX}_COVERAGE            Collect coverage in workers (true/false)");
    println!("  {ENV_PREFIX}_AGGREGATE_COVERAGE  Merge worker coverage (true/false)");
    println!("  {ENV_PREFIX}_SHOW_OUTPUT         Keep worker output (true/false)");
    println!("  {ENV_PREFIX}_VERBOSE             Log per-file results (true/false)");
    println!("  {ENV_PREFIX}_INTERPRETER         Program that runs each test file");
    println!("  {ENV_PREFIX}_FILTER              Test name filter");
    println!("  {ENV_PREFIX}_TAGS                Comma separated tags");
    println!("  {ENV_PREFIX}_CONFIG              Path to configuration file");
}
