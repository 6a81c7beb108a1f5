//! Derived branch-prediction statistics.
//!
//! Turns raw [`MetricRecord`]s into per-test summary rows and per-directory
//! aggregates. Missing inputs propagate as `None` rather than NaN, so a test
//! without a mispredict count simply has no mispredict percentage.

use crate::metrics::{self, AnalysisResult, MetricRecord, RunStatus};

/// Summary row for a single test.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSummary {
    /// Test name (persisted file stem).
    pub name: String,
    /// Outcome of the profiling run.
    pub status: RunStatus,
    /// Number of ticks (or cycles).
    pub ticks: Option<u64>,
    /// Branch-predictor lookups.
    pub bp_lookups: Option<u64>,
    /// Ticks per branch lookup, rounded to two decimals.
    pub ticks_per_bp: Option<f64>,
    /// Mispredicted conditional branches.
    pub bp_incorrect: Option<u64>,
    /// Mispredict rate in percent, rounded to two decimals.
    pub bp_incorrect_pct: Option<f64>,
}

/// Summary of one source directory of packed records.
#[derive(Debug, Clone, PartialEq)]
pub struct DirSummary {
    /// Source directory as given on the command line.
    pub dir: String,
    /// Per-test rows, sorted by test name.
    pub tests: Vec<TestSummary>,
    /// Aggregate mispredict rate: total incorrect over total lookups.
    pub bp_incorrect_pct: Option<f64>,
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `numerator / denominator * scale`, or `0` when the denominator is zero.
fn ratio(numerator: u64, denominator: u64, scale: f64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        round2(numerator as f64 / denominator as f64 * scale)
    }
}

/// Compute the summary row for one test record.
pub fn summarize_test(name: &str, record: &MetricRecord) -> TestSummary {
    let ticks = record.get(metrics::SIM_TICKS);
    let bp_lookups = record.get(metrics::BP_LOOKUPS);
    let bp_incorrect = record.get(metrics::BP_COND_INCORRECT);

    TestSummary {
        name: name.to_string(),
        status: record.status(),
        ticks,
        bp_lookups,
        ticks_per_bp: ticks
            .zip(bp_lookups)
            .map(|(t, l)| ratio(t, l, 1.0)),
        bp_incorrect,
        bp_incorrect_pct: bp_incorrect
            .zip(bp_lookups)
            .map(|(i, l)| ratio(i, l, 100.0)),
    }
}

/// Aggregate mispredict rate over a set of rows.
///
/// Only rows with both a lookup and an incorrect count contribute. Returns
/// `None` when no row contributes or the total lookup count is zero.
pub fn aggregate_incorrect_pct<'a>(rows: impl IntoIterator<Item = &'a TestSummary>) -> Option<f64> {
    let (incorrect, lookups) = rows
        .into_iter()
        .filter_map(|row| row.bp_incorrect.zip(row.bp_lookups))
        .fold((0u128, 0u128), |(i, l), (ri, rl)| {
            (i + u128::from(ri), l + u128::from(rl))
        });
    if lookups == 0 {
        return None;
    }
    Some(round2(incorrect as f64 / lookups as f64 * 100.0))
}

/// Summarize every record of one directory.
pub fn summarize_dir(dir: &str, result: &AnalysisResult) -> DirSummary {
    let tests: Vec<TestSummary> = result
        .iter()
        .map(|(name, record)| summarize_test(name, record))
        .collect();
    let bp_incorrect_pct = aggregate_incorrect_pct(&tests);
    DirSummary {
        dir: dir.to_string(),
        tests,
        bp_incorrect_pct,
    }
}

/// Aggregate mispredict rate across several directories at once.
pub fn aggregate_all(dirs: &[DirSummary]) -> Option<f64> {
    aggregate_incorrect_pct(dirs.iter().flat_map(|d| d.tests.iter()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{BP_COND_INCORRECT, BP_LOOKUPS, SIM_TICKS};

    fn record(ticks: u64, lookups: u64, incorrect: u64) -> MetricRecord {
        [
            (SIM_TICKS, ticks),
            (BP_LOOKUPS, lookups),
            (BP_COND_INCORRECT, incorrect),
        ]
        .into_iter()
        .collect()
    }

    fn single(dir: &str, name: &str, rec: MetricRecord) -> DirSummary {
        let mut result = AnalysisResult::new();
        result.insert(name.to_string(), rec);
        summarize_dir(dir, &result)
    }

    #[test]
    fn derived_row() {
        let row = summarize_test("loop", &record(1000, 300, 7));
        assert_eq!(row.ticks_per_bp, Some(3.33));
        assert_eq!(row.bp_incorrect_pct, Some(2.33));
        assert_eq!(row.status, RunStatus::Completed);
    }

    #[test]
    fn zero_lookups_yield_zero_ratios() {
        let row = summarize_test("empty", &record(1000, 0, 0));
        assert_eq!(row.ticks_per_bp, Some(0.0));
        assert_eq!(row.bp_incorrect_pct, Some(0.0));
    }

    #[test]
    fn missing_metric_propagates_as_none() {
        let rec: MetricRecord = [(SIM_TICKS, 10), (BP_LOOKUPS, 5)].into_iter().collect();
        let row = summarize_test("partial", &rec);
        assert_eq!(row.ticks_per_bp, Some(2.0));
        assert_eq!(row.bp_incorrect, None);
        assert_eq!(row.bp_incorrect_pct, None);
    }

    #[test]
    fn aggregate_across_two_directories() {
        let a = single("suite-a", "t1", record(1000, 100, 5));
        let b = single("suite-b", "t2", record(2000, 200, 40));
        assert_eq!(a.bp_incorrect_pct, Some(5.0));
        assert_eq!(b.bp_incorrect_pct, Some(20.0));
        assert_eq!(aggregate_all(&[a, b]), Some(15.0));
    }

    #[test]
    fn failed_tests_do_not_contribute() {
        let mut result = AnalysisResult::new();
        result.insert("ok".into(), record(1000, 100, 10));
        result.insert("slow".into(), MetricRecord::timed_out());
        let dir = summarize_dir("d", &result);
        assert_eq!(dir.bp_incorrect_pct, Some(10.0));
        assert_eq!(dir.tests[1].status, RunStatus::TimedOut);
    }

    #[test]
    fn empty_directory_has_no_aggregate() {
        let dir = summarize_dir("d", &AnalysisResult::new());
        assert_eq!(dir.bp_incorrect_pct, None);
    }
}
