//! Coverage records
//!
//! Per-file line and function hit counts, keyed by source path.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hit counts for one source file
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCoverage {
    #[serde(default)]
    pub lines: BTreeMap<u32, u64>,
    #[serde(default)]
    pub functions: BTreeMap<String, u64>,
}

impl FileCoverage {
    pub fn lines_tracked(&self) -> usize {
        self.lines.len()
    }

    pub fn lines_hit(&self) -> usize {
        self.lines.values().filter(|hits| **hits > 0).count()
    }

    pub fn functions_hit(&self) -> usize {
        self.functions.values().filter(|hits| **hits > 0).count()
    }
}

/// Coverage for a set of source files
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageMap {
    pub files: BTreeMap<String, FileCoverage>,
}

impl CoverageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&FileCoverage> {
        self.files.get(path)
    }

    /// Record hits for a single line
    pub fn record_line(&mut self, path: impl Into<String>, line: u32, hits: u64) {
        let entry = self.files.entry(path.into()).or_default();
        let count = entry.lines.entry(line).or_insert(0);
        *count = count.saturating_add(hits);
    }

    /// Record hits for a single function
    pub fn record_function(&mut self, path: impl Into<String>, name: impl Into<String>, hits: u64) {
        let entry = self.files.entry(path.into()).or_default();
        let count = entry.functions.entry(name.into()).or_insert(0);
        *count = count.saturating_add(hits);
    }

    pub fn summary(&self) -> CoverageSummary {
        let mut summary = CoverageSummary {
            files: self.files.len(),
            ..Default::default()
        };
        for coverage in self.files.values() {
            summary.lines_tracked += coverage.lines_tracked();
            summary.lines_hit += coverage.lines_hit();
            summary.functions_tracked += coverage.functions.len();
            summary.functions_hit += coverage.functions_hit();
        }
        summary
    }
}

/// Totals across a coverage map
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CoverageSummary {
    pub files: usize,
    pub lines_tracked: usize,
    pub lines_hit: usize,
    pub functions_tracked: usize,
    pub functions_hit: usize,
}

impl CoverageSummary {
    /// Percentage of tracked lines that were hit
    pub fn line_rate(&self) -> f64 {
        if self.lines_tracked == 0 {
            0.0
        } else {
            (self.lines_hit as f64 / self.lines_tracked as f64) * 100.0
        }
    }
}
