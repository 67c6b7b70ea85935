//! testfleet - parallel test-file runner
//!
//! Runs each test file in an isolated worker process, a bounded number at a
//! time, and reports the combined results.
//!
//! ## Usage
//!
//! ```bash
//! # Run two spec files with four workers
//! testfleet -j 4 --interpreter busted spec/a_spec.lua spec/b_spec.lua
//!
//! # Stop after the first failing file
//! testfleet --fail-fast spec/*.lua
//!
//! # Collect and merge coverage, JSON report
//! testfleet --coverage --aggregate-coverage -f json spec/*.lua
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::info;

mod cli;

use cli::Args;
use testfleet::config::{print_env_help, ConfigFile, EnvConfig};
use testfleet::output::{write_report_to_file, OutputFormat, ReportFormatter};
use testfleet::utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    if args.env_help {
        print_env_help();
        return Ok(ExitCode::SUCCESS);
    }

    let level = match &args.log_level {
        Some(level) => Some(
            LogLevel::from_str(level)
                .ok_or_else(|| anyhow::anyhow!("Unknown log level: {level}"))?,
        ),
        None if args.verbose => Some(LogLevel::Debug),
        None => None,
    };
    init_logger(level);

    let env = EnvConfig::load();
    let file_config = match args
        .config
        .clone()
        .or_else(|| env.config_file.clone().map(Into::into))
    {
        Some(path) => ConfigFile::load(&path)?,
        None => ConfigFile::load_default()?,
    };

    let config = args.apply(file_config.run.apply_env(&env));
    config.validate().context("Invalid run configuration")?;

    let format = OutputFormat::from_str(&args.format)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {}", args.format))?;

    info!(
        "Running {} files with {} ({} workers)",
        args.files.len(),
        config.interpreter,
        config.workers
    );

    let result = testfleet::run_tests(&args.files, &config).await?;

    let mut formatter = ReportFormatter::new(format);
    if args.no_color {
        formatter = formatter.no_color();
    }
    println!("{}", formatter.format(&result));

    if let Some(path) = &args.output {
        write_report_to_file(path, &result, format)
            .with_context(|| format!("Failed to write report to {path}"))?;
        info!("Report saved to {}", path);
    }

    Ok(if result.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
