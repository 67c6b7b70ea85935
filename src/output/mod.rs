//! Output formatting module
//!
//! Renders run results for the command line.

mod formatter;

pub use formatter::{write_report_to_file, OutputFormat, ReportFormatter};
