//! Command-line interface definitions for bpscope.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Branch-predictor benchmarking driver.
#[derive(Parser)]
#[command(name = "bpscope", version, about)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Only print warnings, errors and final summaries.
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print command lines, resolved settings and timings.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Log level of the program.
    #[arg(
        long,
        alias = "log_level",
        global = true,
        ignore_case = true,
        value_parser = ["critical", "error", "warning", "info", "debug"],
    )]
    pub log_level: Option<String>,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Build every test, profile it and save one metric record per test.
    Analyze(AnalyzeArgs),
    /// Summarize saved metric records into tables and a bar chart.
    Summarize(SummarizeArgs),
}

/// Arguments for the `analyze` subcommand.
///
/// Every option is optional so that values from `--config-file` can fill in
/// whatever was not given on the command line.
#[derive(Parser, Default)]
pub struct AnalyzeArgs {
    /// Path to a TOML config file.
    #[arg(long, alias = "config_file")]
    pub config_file: Option<PathBuf>,

    /// Path to the output directory (default: analyze).
    #[arg(long, alias = "out_dir")]
    pub out_dir: Option<PathBuf>,

    /// Path to the directory with tests (default: tests).
    #[arg(long, alias = "test_dir")]
    pub test_dir: Option<PathBuf>,

    /// Number of seconds after which a test is stopped (default: 10).
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Path to the compiler (default: gcc).
    #[arg(long)]
    pub compiler: Option<String>,

    /// Arguments passed on to the compiler, shell-quoted.
    #[arg(long, alias = "compiler_args", allow_hyphen_values = true)]
    pub compiler_args: Option<String>,

    /// Type of profiler: perf or gem5 (default: perf).
    #[arg(long)]
    pub profiler: Option<String>,

    /// perf command, shell-quoted (default: perf).
    #[arg(long, alias = "perf_bin")]
    pub perf_bin: Option<String>,

    /// Path to the gem5 home directory (default: ./).
    #[arg(long, alias = "gem5_home")]
    pub gem5_home: Option<PathBuf>,

    /// gem5 binary, shell-quoted (default: ./).
    #[arg(long, alias = "gem5_bin")]
    pub gem5_bin: Option<String>,

    /// Instruction set architecture being simulated.
    #[arg(long, alias = "target_isa")]
    pub target_isa: Option<String>,

    /// Path to the gem5 simulation script (default: ./).
    #[arg(long, alias = "sim_script")]
    pub sim_script: Option<PathBuf>,

    /// Number of tests profiled at once (0 = one per CPU, default: 1).
    #[arg(long, short = 'j')]
    pub jobs: Option<usize>,
}

/// Arguments for the `summarize` subcommand.
#[derive(Parser)]
pub struct SummarizeArgs {
    /// Directories of saved metric records.
    #[arg(long, alias = "src_dirs", num_args = 1.., required = true)]
    pub src_dirs: Vec<PathBuf>,

    /// Path to the output directory.
    #[arg(long, alias = "out_dir", default_value = "summarize")]
    pub out_dir: PathBuf,

    /// Do not print the BP incorrect % bar chart.
    #[arg(long, alias = "no_show_graph")]
    pub no_show_graph: bool,

    /// Do not save the BP incorrect % bar chart to graph.txt.
    #[arg(long, alias = "no_save_graph")]
    pub no_save_graph: bool,
}
