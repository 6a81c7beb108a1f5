//! bpscope: branch-predictor benchmarking.
//!
//! Pipeline: discover tests → compile each one → profile each artifact under
//! `perf stat` or gem5 with a deadline → save one metric record per test.
//! `bpscope summarize` turns saved records into tables and a bar chart.

mod analyze;
mod analyzer;
mod builder;
mod cli;
mod config;
mod error;
mod packer;
mod process;
mod summarize;
mod verbose;

use anyhow::{Context, Result};
use clap::Parser;

use crate::analyze::Analyze;
use crate::config::{AnalyzeSettings, FileConfig};
use crate::verbose::Verbosity;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    verbose::init(Verbosity::from_flags(cli.quiet, cli.verbose, cli.log_level.as_deref()));

    match cli.command {
        cli::Command::Analyze(ref args) => cmd_analyze(&cli, args),
        cli::Command::Summarize(ref args) => summarize::cmd_summarize(args),
    }
}

/// `bpscope analyze`.
fn cmd_analyze(cli: &cli::Cli, args: &cli::AnalyzeArgs) -> Result<()> {
    let file = match &args.config_file {
        Some(path) => FileConfig::load(path)
            .with_context(|| format!("failed to load config file {}", path.display()))?,
        None => FileConfig::default(),
    };
    if cli.log_level.is_none() && !cli.quiet && !cli.verbose {
        if let Some(level) = file.log_level.as_deref() {
            verbose::init(Verbosity::from_flags(false, false, Some(level)));
        }
    }

    let settings = AnalyzeSettings::resolve(file, args).context("invalid analyze settings")?;
    let mut analyze = Analyze::new();
    analyze
        .configure(settings)
        .context("failed to configure analysis")?;
    analyze.run().context("analysis failed")?;
    Ok(())
}
