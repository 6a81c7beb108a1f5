//! Cycle-level simulation with gem5.
//!
//! Each test is run as
//! `<gem5 bin> --outdir=<artifact>.m5out <sim script> --cmd=<artifact> [--isa=<isa>]`
//! from the gem5 home directory, and the branch-predictor statistics are
//! read back from `<artifact>.m5out/stats.txt`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use bpscope_perf::gem5_stats::{self, STATS_FILE};
use bpscope_perf::metrics::{AnalysisResult, MetricRecord};

use super::{Analyzer, Harness, Profile, absolute};
use crate::builder::Artifact;
use crate::config::{self, AnalyzeSettings};
use crate::error::{Error, Result};
use crate::process::{self, Exit};
use crate::verbose::{vprintln, wprintln};

/// Suffix of the per-test gem5 output directory.
pub const OUTDIR_SUFFIX: &str = ".m5out";

#[derive(Debug, Clone)]
pub struct GemAnalyzer {
    harness: Harness,
    gem5_home: PathBuf,
    program: PathBuf,
    prefix_args: Vec<String>,
    sim_script: PathBuf,
    target_isa: String,
}

impl GemAnalyzer {
    /// Take the gem5 paths from `settings`; the build side comes from `harness`.
    pub fn new(harness: Harness, settings: &AnalyzeSettings) -> Result<Self> {
        let gem5_home = absolute(&settings.gem5_home)?;
        let (program, prefix_args) = config::split_command("gem5 bin", &settings.gem5_bin)?;
        Ok(Self {
            harness,
            program: resolve_program(&gem5_home, &program),
            prefix_args,
            sim_script: settings.sim_script.clone(),
            target_isa: settings.target_isa.clone(),
            gem5_home,
        })
    }

    fn command(&self, artifact: &Path, outdir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(&self.gem5_home)
            .args(&self.prefix_args)
            .arg(prefixed("--outdir=", outdir))
            .arg(&self.sim_script)
            .arg(prefixed("--cmd=", artifact));
        if !self.target_isa.is_empty() {
            cmd.arg(format!("--isa={}", self.target_isa));
        }
        cmd
    }
}

impl Analyzer for GemAnalyzer {
    fn name(&self) -> &'static str {
        "gem5"
    }

    fn analyze(&self, test_dir: &Path) -> Result<AnalysisResult> {
        self.harness.run(self, test_dir)
    }
}

impl Profile for GemAnalyzer {
    fn profile(&self, artifact: &Artifact, timeout: Duration) -> Result<MetricRecord> {
        // gem5 runs from its home directory, so every path handed to it is absolute.
        let artifact_path = absolute(&artifact.path)?;
        let outdir = outdir_path(&artifact_path);
        if outdir.exists() {
            std::fs::remove_dir_all(&outdir).map_err(Error::io(&outdir))?;
        }

        let mut cmd = self.command(&artifact_path, &outdir);
        vprintln!("    {cmd:?}");
        let outcome = process::run_with_timeout(&mut cmd, timeout)?;
        vprintln!("    {}: {:.1?}", artifact.name, outcome.elapsed);

        match outcome.exit {
            Exit::TimedOut => Ok(MetricRecord::timed_out()),
            Exit::Failed { code, signal } => Ok(MetricRecord::crashed(code, signal)),
            Exit::Success => match gem5_stats::read_stats(&outdir) {
                Ok(record) => Ok(record),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    wprintln!("{}: gem5 wrote no {STATS_FILE}", artifact.name);
                    vprintln!("{}", String::from_utf8_lossy(&outcome.stdout));
                    Ok(MetricRecord::new())
                }
                Err(err) => Err(Error::io(outdir.join(STATS_FILE))(err)),
            },
        }
    }
}

/// Relative paths with a directory component are taken relative to the
/// gem5 home; bare names are looked up on `PATH`.
fn resolve_program(gem5_home: &Path, program: &str) -> PathBuf {
    let path = Path::new(program);
    if path.is_relative() && path.components().count() > 1 {
        gem5_home.join(path)
    } else {
        path.to_path_buf()
    }
}

fn outdir_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_os_string();
    name.push(OUTDIR_SUFFIX);
    PathBuf::from(name)
}

fn prefixed(flag: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(flag);
    arg.push(path);
    arg
}
