//! The `analyze` pipeline: configure, build, profile, pack.

use std::path::{Path, PathBuf};

use bpscope_perf::metrics::AnalysisResult;

use crate::analyzer::{Analyzer, GemAnalyzer, Harness, PerfAnalyzer};
use crate::builder::{BuildSettings, Builder};
use crate::config::{AnalyzeSettings, Profiler};
use crate::error::{Error, Result};
use crate::packer;
use crate::verbose::{self, Timer, dprintln, wprintln};

/// Subdirectory of the output directory holding artifacts and raw reports.
pub const BUILD_DIR: &str = ".build";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzeState {
    Unconfigured,
    Configured,
    Ran,
}

/// Drives one analysis from settings to packed records.
pub struct Analyze {
    state: AnalyzeState,
    settings: Option<AnalyzeSettings>,
    analyzer: Option<Box<dyn Analyzer>>,
}

impl Default for Analyze {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyze {
    pub fn new() -> Self {
        Self {
            state: AnalyzeState::Unconfigured,
            settings: None,
            analyzer: None,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> AnalyzeState {
        self.state
    }

    /// Validate `settings` and select the profiler backend.
    ///
    /// An unknown profiler name is an [`Error::Config`]. On error the
    /// previous configuration, if any, is kept.
    pub fn configure(&mut self, settings: AnalyzeSettings) -> Result<()> {
        let build_dir = settings
            .out_dir
            .as_deref()
            .map_or_else(|| PathBuf::from(BUILD_DIR), |out| out.join(BUILD_DIR));
        let profiler = settings.profiler()?;
        let builder = Builder::new(BuildSettings::from_settings(&settings)?);
        let harness = Harness::new(builder, build_dir, settings.timeout, settings.worker_count());
        let analyzer: Box<dyn Analyzer> = match profiler {
            Profiler::Perf => Box::new(PerfAnalyzer::new(harness, &settings.perf_bin)?),
            Profiler::Gem5 => Box::new(GemAnalyzer::new(harness, &settings)?),
        };

        self.analyzer = Some(analyzer);
        self.settings = Some(settings);
        self.state = AnalyzeState::Configured;
        Ok(())
    }

    /// Clear the output directory, analyze every test and pack the records.
    ///
    /// Does nothing, apart from a warning, when unconfigured or when the test
    /// or output directory is unset.
    pub fn run(&mut self) -> Result<()> {
        let (Some(settings), Some(analyzer)) = (&self.settings, &self.analyzer) else {
            wprintln!("analysis is not configured, nothing to do");
            return Ok(());
        };
        let (Some(test_dir), Some(out_dir)) = (&settings.test_dir, &settings.out_dir) else {
            wprintln!("test directory or output directory is not set, nothing to do");
            return Ok(());
        };
        if verbose::is_verbose() {
            settings.print();
        }

        dprintln!("Analyzing {} with {}...", test_dir.display(), analyzer.name());
        create_empty_dir(out_dir)?;
        let result = self.analyze(test_dir)?;
        self.pack(out_dir, &result)?;
        dprintln!("Wrote {} record(s) to {}", result.len(), out_dir.display());

        self.state = AnalyzeState::Ran;
        Ok(())
    }

    fn analyze(&self, test_dir: &Path) -> Result<AnalysisResult> {
        let Some(analyzer) = &self.analyzer else {
            return Ok(AnalysisResult::new());
        };
        let _t = Timer::start("analyze");
        analyzer.analyze(test_dir)
    }

    fn pack(&self, out_dir: &Path, result: &AnalysisResult) -> Result<()> {
        let _t = Timer::start("pack");
        packer::pack(out_dir, result)
    }
}

/// Remove `dir` and everything in it, then create it again.
fn create_empty_dir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(Error::io(dir)(err)),
    }
    std::fs::create_dir_all(dir).map_err(Error::io(dir))
}
