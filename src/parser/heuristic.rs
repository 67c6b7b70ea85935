//! Plain-text fallback parsing
//!
//! Counts status lines by their leading marker. Used when a worker does not
//! emit the sentinel block.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{TestError, WorkerResult};

/// ANSI escape sequences (CSI, OSC, and single-character escapes)
static ANSI_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\x1b\[[0-9;?]*[a-zA-Z]",
        r"|\x1b\][^\x07]*\x07",
        r"|\x1b\][^\x1b]*\x1b\\",
        r"|\x1b.",
        r"|\r",
    ))
    .expect("Invalid ANSI regex pattern")
});

/// Leading test number in TAP-style lines, e.g. `ok 3 - name`
static TAP_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s*").expect("Invalid TAP regex pattern"));

/// Strip ANSI escape codes from captured output
pub fn strip_ansi(input: &str) -> String {
    ANSI_REGEX.replace_all(input, "").into_owned()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LineStatus {
    Pass,
    Fail,
    Skip,
    Pending,
}

/// What may follow a marker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Boundary {
    /// Anything, e.g. `✓name`
    Any,
    /// End of line, whitespace, or `:`
    Word,
    /// Whitespace only, optionally followed by a TAP test number
    Tap,
}

struct Marker {
    text: &'static str,
    status: LineStatus,
    boundary: Boundary,
}

const fn word(text: &'static str, status: LineStatus) -> Marker {
    Marker {
        text,
        status,
        boundary: Boundary::Word,
    }
}

const fn symbol(text: &'static str, status: LineStatus) -> Marker {
    Marker {
        text,
        status,
        boundary: Boundary::Any,
    }
}

const fn tap(text: &'static str, status: LineStatus) -> Marker {
    Marker {
        text,
        status,
        boundary: Boundary::Tap,
    }
}

/// Checked in order; longer markers come before their prefixes
const MARKERS: &[Marker] = &[
    tap("not ok", LineStatus::Fail),
    word("[fail]", LineStatus::Fail),
    word("fail", LineStatus::Fail),
    symbol("✗", LineStatus::Fail),
    symbol("✘", LineStatus::Fail),
    word("[pass]", LineStatus::Pass),
    word("pass", LineStatus::Pass),
    tap("ok", LineStatus::Pass),
    symbol("✓", LineStatus::Pass),
    symbol("✔", LineStatus::Pass),
    word("[skip]", LineStatus::Skip),
    word("skip", LineStatus::Skip),
    symbol("○", LineStatus::Skip),
    word("[pending]", LineStatus::Pending),
    word("pending", LineStatus::Pending),
    word("todo", LineStatus::Pending),
    symbol("…", LineStatus::Pending),
];

/// Match a status marker at the start of a trimmed line, returning the rest
fn classify(line: &str) -> Option<(LineStatus, &str)> {
    for marker in MARKERS {
        let len = marker.text.len();
        let Some(head) = line.get(..len) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(marker.text) {
            continue;
        }

        let rest = &line[len..];
        let next = rest.chars().next();
        let bounded = match marker.boundary {
            Boundary::Any => true,
            Boundary::Word => next.is_none_or(|c| c.is_whitespace() || c == ':'),
            // `not ok` may end the line, `ok` needs a trailing space
            Boundary::Tap => next.map_or(len > 2, char::is_whitespace),
        };
        if !bounded {
            continue;
        }

        let mut rest = rest.trim_start();
        if marker.boundary == Boundary::Tap {
            rest = TAP_NUMBER.find(rest).map_or(rest, |m| &rest[m.end()..]);
        }
        let rest = rest
            .trim_start_matches(|c: char| c == ':' || c == '-' || c.is_whitespace())
            .trim_end();

        // tally lines such as `Pass: 12`
        if marker.boundary != Boundary::Tap
            && !rest.is_empty()
            && rest.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        return Some((marker.status, rest));
    }
    None
}

/// Derive counts and failure messages from plain status lines
pub(super) fn scan(raw_output: &str, elapsed: f64, success: bool) -> WorkerResult {
    let clean = strip_ansi(raw_output);
    let mut result = WorkerResult::empty(raw_output, elapsed, success);
    // index into result.errors still collecting traceback lines
    let mut open_error: Option<usize> = None;

    for line in clean.lines() {
        let trimmed = line.trim_start();
        let indented = trimmed.len() < line.len();

        match classify(trimmed) {
            Some((status, rest)) => {
                open_error = None;
                match status {
                    LineStatus::Pass => result.passed += 1,
                    LineStatus::Skip => result.skipped += 1,
                    LineStatus::Pending => result.pending += 1,
                    LineStatus::Fail => {
                        result.failed += 1;
                        let message = if rest.is_empty() { trimmed } else { rest };
                        result.errors.push(TestError::new(message));
                        open_error = Some(result.errors.len() - 1);
                    }
                }
            }
            None => match open_error {
                Some(idx) if indented && !trimmed.is_empty() => {
                    let error = &mut result.errors[idx];
                    let traceback = error.traceback.get_or_insert_with(String::new);
                    if !traceback.is_empty() {
                        traceback.push('\n');
                    }
                    traceback.push_str(trimmed.trim_end());
                }
                Some(_) if trimmed.is_empty() => {}
                _ => open_error = None,
            },
        }
    }

    result.total = result.counted();
    result.success = success && result.failed == 0;
    result
}
