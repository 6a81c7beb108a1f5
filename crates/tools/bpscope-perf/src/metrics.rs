//! Flat per-test metric records.
//!
//! A [`MetricRecord`] maps canonical metric names to non-negative integers.
//! Both profiling backends translate their native counter names into the
//! canonical ones below, so downstream summaries never need to know which
//! backend produced a record.
//!
//! Run failures are stored in the same flat map under reserved `run.*` keys.
//! This keeps the persisted format a plain `string -> integer` object while
//! still letting readers tell a timeout from a crash.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Total elapsed ticks (gem5) or cycles (perf).
pub const SIM_TICKS: &str = "simTicks";
/// Branch-predictor lookups (gem5) or retired branches (perf).
pub const BP_LOOKUPS: &str = "branchPred.lookups";
/// Mispredicted conditional branches (gem5) or branch misses (perf).
pub const BP_COND_INCORRECT: &str = "branchPred.condIncorrect";

/// Set to `1` when the test was killed after exceeding its timeout.
pub const RUN_TIMED_OUT: &str = "run.timedOut";
/// Set to `1` when the test process exited unsuccessfully.
pub const RUN_CRASHED: &str = "run.crashed";
/// Exit code of a crashed test, when it exited normally.
pub const RUN_EXIT_CODE: &str = "run.exitCode";
/// Signal number that terminated a crashed test.
pub const RUN_SIGNAL: &str = "run.signal";

/// The canonical metric names, in report order.
pub const CANONICAL_METRICS: [&str; 3] = [SIM_TICKS, BP_LOOKUPS, BP_COND_INCORRECT];

/// Outcome of a single profiling run, decoded from a record's `run.*` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The run finished and its report was parsed.
    Completed,
    /// The run exceeded the timeout and was killed.
    TimedOut,
    /// The run terminated unsuccessfully.
    Crashed {
        exit_code: Option<u64>,
        signal: Option<u64>,
    },
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "ok"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Crashed {
                exit_code: Some(code),
                ..
            } => write!(f, "crashed (exit code {code})"),
            Self::Crashed {
                signal: Some(sig), ..
            } => write!(f, "crashed (signal {sig})"),
            Self::Crashed { .. } => write!(f, "crashed"),
        }
    }
}

/// Metric name to value mapping for exactly one test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricRecord {
    values: BTreeMap<String, u64>,
}

impl MetricRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for a test that exceeded its timeout. Carries no metrics.
    pub fn timed_out() -> Self {
        let mut record = Self::new();
        record.insert(RUN_TIMED_OUT, 1);
        record
    }

    /// Record for a test that terminated unsuccessfully. Carries no metrics.
    ///
    /// Negative exit codes (only possible on some platforms) are dropped
    /// since persisted values are unsigned.
    pub fn crashed(exit_code: Option<i32>, signal: Option<i32>) -> Self {
        let mut record = Self::new();
        record.insert(RUN_CRASHED, 1);
        if let Some(code) = exit_code.and_then(|c| u64::try_from(c).ok()) {
            record.insert(RUN_EXIT_CODE, code);
        }
        if let Some(sig) = signal.and_then(|s| u64::try_from(s).ok()) {
            record.insert(RUN_SIGNAL, sig);
        }
        record
    }

    /// Set a metric, replacing any previous value.
    pub fn insert(&mut self, name: &str, value: u64) {
        self.values.insert(name.to_string(), value);
    }

    /// Add to a metric, creating it if absent.
    pub fn accumulate(&mut self, name: &str, value: u64) {
        let slot = self.values.entry(name.to_string()).or_insert(0);
        *slot = slot.saturating_add(value);
    }

    /// Look up a metric. Absent metrics return `None`.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.values.get(name).copied()
    }

    /// Iterate over `(name, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Decode the run outcome from the reserved `run.*` keys.
    pub fn status(&self) -> RunStatus {
        if self.get(RUN_TIMED_OUT).is_some_and(|v| v != 0) {
            RunStatus::TimedOut
        } else if self.get(RUN_CRASHED).is_some_and(|v| v != 0) {
            RunStatus::Crashed {
                exit_code: self.get(RUN_EXIT_CODE),
                signal: self.get(RUN_SIGNAL),
            }
        } else {
            RunStatus::Completed
        }
    }
}

impl<'a> FromIterator<(&'a str, u64)> for MetricRecord {
    fn from_iter<I: IntoIterator<Item = (&'a str, u64)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

/// Per-test records for one analysis run, keyed by test name.
pub type AnalysisResult = BTreeMap<String, MetricRecord>;
