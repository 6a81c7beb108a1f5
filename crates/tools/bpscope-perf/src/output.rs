//! Text formatting for summary tables and bar charts.
//!
//! Everything renders into a `String` so the same text can go to the
//! terminal and into report files.

use std::fmt::Write;

use crate::metrics::RunStatus;
use crate::summary::{DirSummary, TestSummary};

/// Width of the longest bar in [`render_bar_chart`].
const BAR_WIDTH: usize = 50;

fn fmt_u64(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn fmt_f64(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn status_cell(row: &TestSummary) -> String {
    match row.status {
        RunStatus::Completed => String::new(),
        other => other.to_string(),
    }
}

/// Render the per-test table of one directory.
pub fn render_dir_table(summary: &DirSummary) -> String {
    let mut out = String::new();
    if summary.tests.is_empty() {
        out.push_str("  No records.\n");
        return out;
    }

    let width = summary
        .tests
        .iter()
        .map(|t| t.name.len())
        .max()
        .unwrap_or(4)
        .max(4);

    let _ = writeln!(
        out,
        "  {:<width$}  {:>15}  {:>12}  {:>12}  {:>12}  {:>14}  {}",
        "Test",
        "Number of ticks",
        "BP lookups",
        "Ticks per BP",
        "BP incorrect",
        "BP incorrect %",
        "Status",
    );
    let _ = writeln!(
        out,
        "  {:-<width$}  {:->15}  {:->12}  {:->12}  {:->12}  {:->14}  {:-<6}",
        "", "", "", "", "", "", "",
    );

    for row in &summary.tests {
        let _ = writeln!(
            out,
            "  {:<width$}  {:>15}  {:>12}  {:>12}  {:>12}  {:>14}  {}",
            row.name,
            fmt_u64(row.ticks),
            fmt_u64(row.bp_lookups),
            fmt_f64(row.ticks_per_bp),
            fmt_u64(row.bp_incorrect),
            fmt_f64(row.bp_incorrect_pct),
            status_cell(row),
        );
    }
    out
}

/// Render the per-directory aggregate table.
pub fn render_aggregate_table(dirs: &[DirSummary]) -> String {
    let mut out = String::new();
    let width = dirs.iter().map(|d| d.dir.len()).max().unwrap_or(9).max(9);

    let _ = writeln!(out, "  {:<width$}  {:>14}", "Directory", "BP incorrect %");
    let _ = writeln!(out, "  {:-<width$}  {:->14}", "", "");
    for dir in dirs {
        let _ = writeln!(
            out,
            "  {:<width$}  {:>14}",
            dir.dir,
            fmt_f64(dir.bp_incorrect_pct),
        );
    }
    out
}

/// Render a horizontal bar chart of BP incorrect % for every test, grouped
/// by directory. Bars are scaled to the largest percentage shown.
pub fn render_bar_chart(dirs: &[DirSummary]) -> String {
    let mut out = String::new();
    let max_pct = dirs
        .iter()
        .flat_map(|d| d.tests.iter())
        .filter_map(|t| t.bp_incorrect_pct)
        .fold(0.0_f64, f64::max);
    let width = dirs
        .iter()
        .flat_map(|d| d.tests.iter())
        .map(|t| t.name.len())
        .max()
        .unwrap_or(4)
        .max(4);

    let _ = writeln!(out, "BP incorrect %");
    for dir in dirs {
        let _ = writeln!(out, "\n  [{}]", dir.dir);
        for row in &dir.tests {
            match row.bp_incorrect_pct {
                Some(pct) => {
                    let len = if max_pct > 0.0 {
                        ((pct / max_pct) * BAR_WIDTH as f64).round() as usize
                    } else {
                        0
                    };
                    let _ = writeln!(
                        out,
                        "  {:<width$} |{:<bar$}| {pct:.2}",
                        row.name,
                        "#".repeat(len),
                        bar = BAR_WIDTH,
                    );
                }
                None => {
                    let _ = writeln!(
                        out,
                        "  {:<width$} |{:<bar$}| -",
                        row.name,
                        "",
                        bar = BAR_WIDTH,
                    );
                }
            }
        }
    }
    out
}
