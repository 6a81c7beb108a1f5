//! Profiler backends.
//!
//! An [`Analyzer`] turns a directory of test sources into one
//! [`MetricRecord`] per test. Both backends share the same pipeline through
//! [`Harness`]: compile every test, then profile the artifacts on a small
//! worker pool with a per-test deadline. Only the profiling step differs.

pub mod gem5;
pub mod perf;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, mpsc};
use std::time::Duration;

use bpscope_perf::metrics::{AnalysisResult, MetricRecord, RunStatus};

use crate::builder::{Artifact, Builder};
use crate::error::{Error, Result};
use crate::verbose::{Timer, dprintln, wprintln};

pub use gem5::GemAnalyzer;
pub use perf::PerfAnalyzer;

/// Produces metric records for every test in a directory.
pub trait Analyzer {
    /// Profiler name, as accepted by `--profiler`.
    fn name(&self) -> &'static str;

    /// Build and profile every test in `test_dir`.
    ///
    /// The result has exactly one entry per test. An empty directory yields
    /// an empty result.
    fn analyze(&self, test_dir: &Path) -> Result<AnalysisResult>;
}

/// Profiles a single compiled test.
pub trait Profile: Sync {
    /// Run `artifact` under the profiler, stopping it after `timeout`.
    ///
    /// Timeouts and crashes are reported through the returned record.
    fn profile(&self, artifact: &Artifact, timeout: Duration) -> Result<MetricRecord>;
}

/// The build-then-profile pipeline shared by every analyzer.
#[derive(Debug, Clone)]
pub struct Harness {
    pub builder: Builder,
    /// Where artifacts and raw profiler output are written.
    pub build_dir: PathBuf,
    pub timeout: Duration,
    pub workers: usize,
}

impl Harness {
    pub fn new(builder: Builder, build_dir: PathBuf, timeout: Duration, workers: usize) -> Self {
        Self {
            builder,
            build_dir,
            timeout,
            workers,
        }
    }

    /// Compile every test in `test_dir` and profile it with `profiler`.
    pub fn run<P: Profile>(&self, profiler: &P, test_dir: &Path) -> Result<AnalysisResult> {
        let artifacts = {
            let _t = Timer::start("build");
            self.builder.build(test_dir, &self.build_dir)?
        };
        if artifacts.is_empty() {
            dprintln!("No tests found in {}", test_dir.display());
            return Ok(AnalysisResult::new());
        }

        let _t = Timer::start("profile");
        let records = if self.workers <= 1 || artifacts.len() == 1 {
            artifacts
                .iter()
                .map(|a| profile_one(profiler, a, self.timeout).map(|r| (a.name.clone(), r)))
                .collect::<Result<Vec<_>>>()?
        } else {
            profile_parallel(profiler, &artifacts, self.timeout, self.workers)?
        };

        Ok(records.into_iter().collect())
    }
}

fn profile_one<P: Profile>(profiler: &P, artifact: &Artifact, timeout: Duration) -> Result<MetricRecord> {
    dprintln!("  Profiling {}", artifact.name);
    let record = profiler.profile(artifact, timeout)?;
    match record.status() {
        RunStatus::Completed => {}
        RunStatus::TimedOut => wprintln!("{} timed out after {:?}", artifact.name, timeout),
        status => wprintln!("{} {}", artifact.name, status),
    }
    Ok(record)
}

/// Profile artifacts on `workers` threads fed from a shared job queue.
///
/// Records are collected on the calling thread. The first fatal error is
/// returned once every worker has stopped.
fn profile_parallel<P: Profile>(
    profiler: &P,
    artifacts: &[Artifact],
    timeout: Duration,
    workers: usize,
) -> Result<Vec<(String, MetricRecord)>> {
    let (job_tx, job_rx) = mpsc::channel::<&Artifact>();
    let (result_tx, result_rx) = mpsc::channel::<(String, Result<MetricRecord>)>();
    let job_rx = Mutex::new(job_rx);

    for artifact in artifacts {
        // The receiver lives until the end of this function.
        let _ = job_tx.send(artifact);
    }
    drop(job_tx);

    std::thread::scope(|s| {
        for _ in 0..workers.min(artifacts.len()) {
            let tx = result_tx.clone();
            let job_rx = &job_rx;
            s.spawn(move || {
                loop {
                    let job = match job_rx.lock() {
                        Ok(rx) => rx.recv(),
                        Err(_) => break,
                    };
                    let Ok(artifact) = job else { break };
                    let record = profile_one(profiler, artifact, timeout);
                    let failed = record.is_err();
                    if tx.send((artifact.name.clone(), record)).is_err() || failed {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut records = Vec::with_capacity(artifacts.len());
        let mut first_error = None;
        for (name, record) in result_rx {
            match record {
                Ok(record) => records.push((name, record)),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(records),
        }
    })
}

/// Make `path` absolute against the current directory.
pub(crate) fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(Error::io(path))
}
