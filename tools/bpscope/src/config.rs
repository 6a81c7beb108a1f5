//! Analysis settings.
//!
//! Values are layered: built-in defaults, then an optional TOML file given
//! with `--config-file`, then command-line flags.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::cli::AnalyzeArgs;
use crate::error::{Error, Result};

pub const DEFAULT_OUT_DIR: &str = "analyze";
pub const DEFAULT_TEST_DIR: &str = "tests";
pub const DEFAULT_TIMEOUT_SECS: f64 = 10.0;
pub const DEFAULT_COMPILER: &str = "gcc";
pub const DEFAULT_PERF_BIN: &str = "perf";
pub const DEFAULT_GEM5_PATH: &str = "./";

/// Supported profiler backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profiler {
    Perf,
    Gem5,
}

impl FromStr for Profiler {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "perf" => Ok(Self::Perf),
            "gem5" => Ok(Self::Gem5),
            other => Err(Error::Config(format!(
                "\"{other}\" is unknown profiler (expected perf or gem5)"
            ))),
        }
    }
}

impl fmt::Display for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Perf => "perf",
            Self::Gem5 => "gem5",
        })
    }
}

/// Contents of a `--config-file`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub out_dir: Option<PathBuf>,
    pub test_dir: Option<PathBuf>,
    pub timeout: Option<f64>,
    pub compiler: Option<String>,
    pub compiler_args: Option<String>,
    pub profiler: Option<String>,
    pub perf_bin: Option<String>,
    pub gem5_home: Option<PathBuf>,
    pub gem5_bin: Option<String>,
    pub target_isa: Option<String>,
    pub sim_script: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub log_level: Option<String>,
}

impl FileConfig {
    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(Error::io(path))?;
        Self::parse(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Fully resolved settings for one `analyze` run.
///
/// `test_dir` and `out_dir` are `None` when explicitly set to an empty path;
/// a run with either unset does nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeSettings {
    pub test_dir: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub compiler: String,
    pub compiler_args: String,
    pub profiler: String,
    pub perf_bin: String,
    pub gem5_home: PathBuf,
    pub gem5_bin: String,
    pub target_isa: String,
    pub sim_script: PathBuf,
    /// Tests profiled concurrently. `0` means one per available CPU.
    pub jobs: usize,
}

impl Default for AnalyzeSettings {
    fn default() -> Self {
        Self {
            test_dir: Some(PathBuf::from(DEFAULT_TEST_DIR)),
            out_dir: Some(PathBuf::from(DEFAULT_OUT_DIR)),
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            compiler: DEFAULT_COMPILER.into(),
            compiler_args: String::new(),
            profiler: Profiler::Perf.to_string(),
            perf_bin: DEFAULT_PERF_BIN.into(),
            gem5_home: PathBuf::from(DEFAULT_GEM5_PATH),
            gem5_bin: DEFAULT_GEM5_PATH.into(),
            target_isa: String::new(),
            sim_script: PathBuf::from(DEFAULT_GEM5_PATH),
            jobs: 1,
        }
    }
}

impl AnalyzeSettings {
    /// Layer `file` and then `args` over the defaults.
    pub fn resolve(file: FileConfig, args: &AnalyzeArgs) -> Result<Self> {
        let mut settings = Self::default();

        macro_rules! layer {
            ($($field:ident),*) => {
                $(
                    if let Some(v) = args.$field.clone().or(file.$field) {
                        settings.$field = v;
                    }
                )*
            };
        }
        layer!(compiler, compiler_args, profiler, perf_bin, gem5_home, gem5_bin, target_isa, sim_script, jobs);

        if let Some(dir) = args.test_dir.clone().or(file.test_dir) {
            settings.test_dir = non_empty(dir);
        }
        if let Some(dir) = args.out_dir.clone().or(file.out_dir) {
            settings.out_dir = non_empty(dir);
        }
        if let Some(secs) = args.timeout.or(file.timeout) {
            settings.timeout = timeout_from_secs(secs)?;
        }

        Ok(settings)
    }

    /// Parsed profiler selection.
    pub fn profiler(&self) -> Result<Profiler> {
        self.profiler.parse()
    }

    /// Number of worker threads to use for profiling.
    pub fn worker_count(&self) -> usize {
        match self.jobs {
            0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        }
    }

    /// Print the resolved settings (verbose mode).
    pub fn print(&self) {
        let show = |p: &Option<PathBuf>| {
            p.as_ref()
                .map_or_else(|| "(unset)".to_string(), |p| p.display().to_string())
        };
        println!("Settings:");
        println!("  test_dir      = {}", show(&self.test_dir));
        println!("  out_dir       = {}", show(&self.out_dir));
        println!("  timeout       = {:?}", self.timeout);
        println!("  compiler      = {} {}", self.compiler, self.compiler_args);
        println!("  profiler      = {}", self.profiler);
        println!("  perf_bin      = {}", self.perf_bin);
        println!("  gem5_home     = {}", self.gem5_home.display());
        println!("  gem5_bin      = {}", self.gem5_bin);
        println!("  target_isa    = {}", self.target_isa);
        println!("  sim_script    = {}", self.sim_script.display());
        println!("  jobs          = {}", self.worker_count());
    }
}

fn non_empty(path: PathBuf) -> Option<PathBuf> {
    (!path.as_os_str().is_empty()).then_some(path)
}

fn timeout_from_secs(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| Error::Config(format!("timeout must be a positive number of seconds, got {secs}")))
}

/// Split a shell-quoted command string into words.
///
/// An empty string yields no words; unbalanced quotes are a config error.
pub fn split_words(what: &str, value: &str) -> Result<Vec<String>> {
    shlex::split(value)
        .ok_or_else(|| Error::Config(format!("{what}: unbalanced quotes in {value:?}")))
}

/// Split a shell-quoted command into program and leading arguments.
pub fn split_command(what: &str, value: &str) -> Result<(String, Vec<String>)> {
    let mut words = split_words(what, value)?.into_iter();
    let program = words
        .next()
        .ok_or_else(|| Error::Config(format!("{what} must not be empty")))?;
    Ok((program, words.collect()))
}
