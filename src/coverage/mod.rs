//! Coverage merging
//!
//! Combines per-worker coverage maps into the run-wide map. Hit counts only
//! ever grow, so merge order never changes the result.

use crate::models::{CoverageMap, FileCoverage};

/// Merge `file_map` into `aggregate`
///
/// Paths not yet present are inserted as-is; known paths have their line and
/// function counts summed entrywise.
pub fn merge(aggregate: &mut CoverageMap, file_map: &CoverageMap) {
    for (path, coverage) in &file_map.files {
        match aggregate.files.get_mut(path) {
            Some(existing) => merge_file(existing, coverage),
            None => {
                aggregate.files.insert(path.clone(), coverage.clone());
            }
        }
    }
}

/// Merge two maps into a new one
pub fn merged(left: &CoverageMap, right: &CoverageMap) -> CoverageMap {
    let mut out = left.clone();
    merge(&mut out, right);
    out
}

fn merge_file(into: &mut FileCoverage, from: &FileCoverage) {
    for (line, hits) in &from.lines {
        let count = into.lines.entry(*line).or_insert(0);
        *count = count.saturating_add(*hits);
    }
    for (name, hits) in &from.functions {
        let count = into.functions.entry(name.clone()).or_insert(0);
        *count = count.saturating_add(*hits);
    }
}
