//! The `summarize` command: tables and a bar chart over packed records.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bpscope_perf::metrics::AnalysisResult;
use bpscope_perf::output;
use bpscope_perf::summary::{self, DirSummary};

use crate::cli::SummarizeArgs;
use crate::packer;
use crate::verbose::{dprintln, vprintln, wprintln};

pub const RESULTS_FILE: &str = "results.data";
pub const GRAPH_FILE: &str = "graph.txt";

/// `bpscope summarize`.
pub fn cmd_summarize(args: &SummarizeArgs) -> Result<()> {
    let mut dirs = Vec::new();
    for src in &args.src_dirs {
        if !src.is_dir() {
            wprintln!("directory {} does not exist, skipping", src.display());
            continue;
        }
        let result = packer::unpack(src)
            .with_context(|| format!("failed to read records from {}", src.display()))?;
        vprintln!("  {}: {} record(s)", src.display(), result.len());
        dirs.push((src.clone(), summary::summarize_dir(&src.display().to_string(), &by_stem(result))));
    }

    if dirs.iter().all(|(_, d)| d.tests.is_empty()) {
        println!("No data to summarize");
        return Ok(());
    }

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;

    let summaries: Vec<DirSummary> = dirs.iter().map(|(_, d)| d.clone()).collect();
    let combined = args.out_dir.join(RESULTS_FILE);
    write_file(&combined, &render_combined(&summaries))?;

    for (src, dir) in &dirs {
        let path = dir_report_path(src, &args.out_dir);
        if path == combined {
            vprintln!("  {}: report would replace {}, skipping", src.display(), path.display());
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        write_file(&path, &render_dir_report(dir))?;
    }

    let chart = output::render_bar_chart(&summaries);
    if !args.no_show_graph {
        print!("{chart}");
    }
    if !args.no_save_graph {
        write_file(&args.out_dir.join(GRAPH_FILE), &chart)?;
    }

    match summary::aggregate_all(&summaries) {
        Some(pct) => println!("Overall BP incorrect %: {pct:.2}"),
        None => println!("Overall BP incorrect %: unknown"),
    }
    dprintln!("Summary written to {}", args.out_dir.display());
    Ok(())
}

/// Re-key records by file stem, so `loop.c` is shown as `loop`.
fn by_stem(result: AnalysisResult) -> AnalysisResult {
    result
        .into_iter()
        .map(|(name, record)| {
            let stem = Path::new(&name)
                .file_stem()
                .and_then(|s| s.to_str())
                .map_or_else(|| name.clone(), str::to_string);
            (stem, record)
        })
        .collect()
}

/// `<parent of src>/<basename of out_dir>/results.data`.
fn dir_report_path(src: &Path, out_dir: &Path) -> PathBuf {
    let parent = src.parent().unwrap_or(Path::new(""));
    let name = out_dir.file_name().unwrap_or(out_dir.as_os_str());
    parent.join(name).join(RESULTS_FILE)
}

fn render_combined(dirs: &[DirSummary]) -> String {
    let mut out = String::from("Summarized data:\n\n");
    out.push_str(&output::render_aggregate_table(dirs));
    for dir in dirs {
        out.push_str(&format!("\ndir: {}\n\n", dir.dir));
        out.push_str(&output::render_dir_table(dir));
    }
    out
}

fn render_dir_report(dir: &DirSummary) -> String {
    let mut out = format!("dir: {}\n\n", dir.dir);
    out.push_str(&output::render_dir_table(dir));
    match dir.bp_incorrect_pct {
        Some(pct) => out.push_str(&format!("\nAverage % of BP incorrect: {pct:.2}\n")),
        None => out.push_str("\nAverage % of BP incorrect: unknown\n"),
    }
    out
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpscope_perf::metrics::{BP_COND_INCORRECT, BP_LOOKUPS, MetricRecord, SIM_TICKS};

    fn record(ticks: u64, lookups: u64, incorrect: u64) -> MetricRecord {
        [
            (SIM_TICKS, ticks),
            (BP_LOOKUPS, lookups),
            (BP_COND_INCORRECT, incorrect),
        ]
        .into_iter()
        .collect()
    }

    fn packed_dir(root: &Path, name: &str, records: &[(&str, MetricRecord)]) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        let result: AnalysisResult = records
            .iter()
            .map(|(n, r)| (n.to_string(), r.clone()))
            .collect();
        packer::pack(&dir, &result).unwrap();
        dir
    }

    fn args(src_dirs: Vec<PathBuf>, out_dir: PathBuf) -> SummarizeArgs {
        SummarizeArgs {
            src_dirs,
            out_dir,
            no_show_graph: true,
            no_save_graph: false,
        }
    }

    #[test]
    fn writes_reports_and_graph() {
        let tmp = tempfile::tempdir().unwrap();
        let a = packed_dir(tmp.path(), "runs/a", &[("x.c", record(1000, 100, 5))]);
        let b = packed_dir(tmp.path(), "runs/b", &[("y.c", record(2000, 200, 40))]);
        let out = tmp.path().join("summary");

        cmd_summarize(&args(vec![a.clone(), b], out.clone())).unwrap();

        let combined = std::fs::read_to_string(out.join(RESULTS_FILE)).unwrap();
        assert!(combined.starts_with("Summarized data:"));
        assert!(combined.contains("5.00"));
        assert!(combined.contains("20.00"));
        assert!(combined.contains(&format!("dir: {}", a.display())));

        // Both source dirs share a parent, so the second report wins.
        let per_dir = std::fs::read_to_string(tmp.path().join("runs/summary").join(RESULTS_FILE)).unwrap();
        assert!(per_dir.contains("Average % of BP incorrect: 20.00"));

        let graph = std::fs::read_to_string(out.join(GRAPH_FILE)).unwrap();
        assert!(graph.lines().any(|l| l.trim_start().starts_with("x ")));
        assert!(graph.lines().any(|l| l.trim_start().starts_with("y ")));
    }

    #[test]
    fn no_save_graph_skips_file() {
        let tmp = tempfile::tempdir().unwrap();
        let a = packed_dir(tmp.path(), "a", &[("x.c", record(10, 10, 1))]);
        let out = tmp.path().join("out");
        let mut a_args = args(vec![a], out.clone());
        a_args.no_save_graph = true;
        cmd_summarize(&a_args).unwrap();
        assert!(out.join(RESULTS_FILE).is_file());
        assert!(!out.join(GRAPH_FILE).exists());
    }

    #[test]
    fn missing_dirs_mean_no_data() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("out");
        cmd_summarize(&args(vec![tmp.path().join("nope")], out.clone())).unwrap();
        assert!(!out.exists());
    }

    #[test]
    fn stems_used_as_test_names() {
        let mut result = AnalysisResult::new();
        result.insert("loop.c".into(), MetricRecord::new());
        result.insert("README".into(), MetricRecord::new());
        let keys: Vec<_> = by_stem(result).into_keys().collect();
        assert_eq!(keys, ["README", "loop"]);
    }

    #[test]
    fn per_dir_report_location() {
        assert_eq!(
            dir_report_path(Path::new("results/perf"), Path::new("out/summarize")),
            PathBuf::from("results/summarize/results.data")
        );
        assert_eq!(
            dir_report_path(Path::new("perf"), Path::new("summarize")),
            PathBuf::from("summarize/results.data")
        );
    }
}
