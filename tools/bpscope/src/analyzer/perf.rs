//! Hardware-counter profiling with `perf stat`.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use bpscope_perf::metrics::{AnalysisResult, MetricRecord};
use bpscope_perf::perf_stat::{self, PERF_EVENTS};

use super::{Analyzer, Harness, Profile};
use crate::builder::Artifact;
use crate::config;
use crate::error::{Error, Result};
use crate::process::{self, Exit};
use crate::verbose::{vprintln, wprintln};

/// Suffix of the per-test counter report written by `perf stat -o`.
pub const REPORT_SUFFIX: &str = ".perf.txt";

/// Runs each test under `perf stat -e cycles,branches,branch-misses`.
#[derive(Debug, Clone)]
pub struct PerfAnalyzer {
    harness: Harness,
    program: String,
    prefix_args: Vec<String>,
}

impl PerfAnalyzer {
    /// `perf_bin` is a shell-quoted command such as `perf` or `sudo perf`.
    pub fn new(harness: Harness, perf_bin: &str) -> Result<Self> {
        let (program, prefix_args) = config::split_command("perf bin", perf_bin)?;
        Ok(Self {
            harness,
            program,
            prefix_args,
        })
    }

    fn command(&self, artifact: &Path, report: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.prefix_args)
            .arg("stat")
            .arg("-e")
            .arg(PERF_EVENTS)
            .arg("-o")
            .arg(report)
            .arg("--")
            .arg(artifact);
        cmd
    }
}

impl Analyzer for PerfAnalyzer {
    fn name(&self) -> &'static str {
        "perf"
    }

    fn analyze(&self, test_dir: &Path) -> Result<AnalysisResult> {
        self.harness.run(self, test_dir)
    }
}

impl Profile for PerfAnalyzer {
    fn profile(&self, artifact: &Artifact, timeout: Duration) -> Result<MetricRecord> {
        let report = report_path(&artifact.path);
        // A stale report from an earlier run must not be mistaken for this one.
        match std::fs::remove_file(&report) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => {
                return Err(Error::io(&report)(err));
            }
            _ => {}
        }

        let mut cmd = self.command(&artifact.path, &report);
        vprintln!("    {cmd:?}");
        let outcome = process::run_with_timeout(&mut cmd, timeout)?;
        vprintln!("    {}: {:.1?}", artifact.name, outcome.elapsed);

        match outcome.exit {
            Exit::TimedOut => Ok(MetricRecord::timed_out()),
            Exit::Failed { code, signal } => Ok(MetricRecord::crashed(code, signal)),
            Exit::Success => {
                let stderr = String::from_utf8_lossy(&outcome.stderr);
                if let Some(signal) = perf_stat::workload_signal(&stderr, &artifact.path.to_string_lossy()) {
                    return Ok(MetricRecord::crashed(None, Some(signal)));
                }
                read_report(&report, &outcome.stdout, &stderr, &artifact.name)
            }
        }
    }
}

/// Parse the report perf wrote to `report`, falling back to its console output.
fn read_report(report: &Path, stdout: &[u8], stderr: &str, name: &str) -> Result<MetricRecord> {
    match std::fs::read_to_string(report) {
        Ok(text) => Ok(perf_stat::parse_report(&text)),
        // Some perf wrappers ignore `-o` and print the report instead.
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let mut record = perf_stat::parse_report(stderr);
            if record.is_empty() {
                record = perf_stat::parse_report(&String::from_utf8_lossy(stdout));
            }
            if record.is_empty() {
                wprintln!("{name}: perf produced no counters");
            }
            Ok(record)
        }
        Err(err) => Err(Error::io(report)(err)),
    }
}

fn report_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_os_string();
    name.push(REPORT_SUFFIX);
    PathBuf::from(name)
}
