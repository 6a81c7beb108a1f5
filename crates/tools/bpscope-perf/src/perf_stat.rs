//! Parser for the human-readable summary printed by `perf stat`.
//!
//! A typical report looks like:
//!
//! ```text
//!  Performance counter stats for './loop.c.out':
//!
//!         1,234,567      cycles:u
//!           123,456      branches:u                #   95.123 M/sec
//!             1,234      branch-misses:u           #    1.00% of all branches
//!
//!        0.001234567 seconds time elapsed
//! ```
//!
//! Counts are printed with the locale's thousands separator, so `1.234.567`,
//! `1 234 567` and `1'234'567` all appear in the wild. Counters that perf
//! could not read are printed as `<not counted>` or `<not supported>` and
//! leave the metric absent.

use crate::metrics::{self, MetricRecord};

/// Events requested from `perf stat -e`.
pub const PERF_EVENTS: &str = "cycles,branches,branch-misses";

/// Characters perf may use to group digits, depending on `LC_NUMERIC`.
const DIGIT_SEPARATORS: [char; 6] = [',', '.', '\'', '_', '\u{a0}', '\u{202f}'];

/// Translate a perf event name into a canonical metric name.
fn canonical_name(event: &str) -> Option<&'static str> {
    match event {
        "cycles" | "cpu-cycles" => Some(metrics::SIM_TICKS),
        "branches" | "branch-instructions" => Some(metrics::BP_LOOKUPS),
        "branch-misses" => Some(metrics::BP_COND_INCORRECT),
        _ => None,
    }
}

/// Strip PMU prefixes and modifiers: `cpu_core/branches/u` and
/// `branches:u` both become `branches`.
fn normalize_event(raw: &str) -> &str {
    let name = match raw.split('/').collect::<Vec<_>>().as_slice() {
        [_pmu, event, ..] if !event.is_empty() => *event,
        _ => raw,
    };
    name.split(':').next().unwrap_or(name)
}

/// Parse a locale-formatted integer count. Returns `None` if no digits remain
/// after dropping separators.
pub fn parse_count(text: &str) -> Option<u64> {
    let digits: String = text
        .chars()
        .filter(|c| !DIGIT_SEPARATORS.contains(c) && !c.is_whitespace())
        .collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Split a counter line into its numeric prefix and the event token.
fn split_counter_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    let number_end = line
        .char_indices()
        .find(|&(_, c)| !(c.is_ascii_digit() || DIGIT_SEPARATORS.contains(&c) || c.is_whitespace()))
        .map(|(i, _)| i)?;
    if number_end == 0 {
        return None;
    }
    let number = &line[..number_end];
    let event = line[number_end..].split_whitespace().next()?;
    Some((number, event))
}

/// `psignal` texts perf prints when the workload dies from a signal, with
/// their Linux signal numbers.
const SIGNAL_DESCRIPTIONS: [(&str, i32); 11] = [
    ("Hangup", 1),
    ("Interrupt", 2),
    ("Quit", 3),
    ("Illegal instruction", 4),
    ("Trace/breakpoint trap", 5),
    ("Aborted", 6),
    ("Bus error", 7),
    ("Floating point exception", 8),
    ("Killed", 9),
    ("Segmentation fault", 11),
    ("Terminated", 15),
];

/// Find the signal that killed `workload`, from perf's
/// `<workload>: <signal description>` line on stderr.
///
/// `perf stat` exits 0 when its workload is killed by a signal, so this line
/// is the only sign of the crash.
pub fn workload_signal(stderr: &str, workload: &str) -> Option<i32> {
    let prefix = format!("{workload}: ");
    stderr.lines().find_map(|line| {
        let description = line.trim_end().strip_prefix(&prefix)?;
        SIGNAL_DESCRIPTIONS
            .iter()
            .find(|(text, _)| *text == description)
            .map(|&(_, signal)| signal)
    })
}

/// Parse a `perf stat` report into a record of canonical metrics.
///
/// Lines that do not carry one of the requested counters are ignored. When
/// the same event is reported more than once (hybrid CPUs print one line per
/// core type) the counts are summed.
pub fn parse_report(report: &str) -> MetricRecord {
    let mut record = MetricRecord::new();
    for line in report.lines() {
        let Some((number, event)) = split_counter_line(line) else {
            continue;
        };
        let Some(name) = canonical_name(normalize_event(event)) else {
            continue;
        };
        if let Some(count) = parse_count(number) {
            record.accumulate(name, count);
        }
    }
    record
}
