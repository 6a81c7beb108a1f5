//! Branch-prediction metric analysis.
//!
//! Provides the flat [`MetricRecord`](metrics::MetricRecord) shared by every
//! profiling backend, parsers for `perf stat` reports and gem5 `stats.txt`
//! dumps, derived summary statistics, and terminal/text output formatting.
//!
//! Extracted from the bpscope host tool so the report parsers can be tested
//! and reused without spawning any processes.

pub mod gem5_stats;
pub mod metrics;
pub mod output;
pub mod perf_stat;
pub mod summary;
