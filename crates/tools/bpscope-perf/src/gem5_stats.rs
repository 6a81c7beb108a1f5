//! Parser for gem5's `stats.txt` dump.
//!
//! Each statistic occupies one line: a dotted key, a value, and an optional
//! `#` comment. A dump is delimited by `Begin Simulation Statistics` and
//! `End Simulation Statistics` banners; simulations that call `m5 dumpstats`
//! produce several dumps, of which only the first is read.
//!
//! ```text
//! ---------- Begin Simulation Statistics ----------
//! simTicks                                 123456       # Number of ticks simulated (Tick)
//! system.cpu.branchPred.lookups              2048       # Number of BP lookups (Count)
//! system.cpu.branchPred.condIncorrect          64       # Number of conditional branches incorrect (Count)
//! ---------- End Simulation Statistics   ----------
//! ```

use crate::metrics::{self, MetricRecord};

/// gem5 statistic names and the canonical metric each one feeds.
///
/// A key matches when it equals the statistic name or ends with
/// `.<name>`, so per-CPU objects (`system.cpu0.branchPred.lookups`) are
/// picked up regardless of the simulated system's object hierarchy.
pub const TRANSLATION: [(&str, &str); 3] = [
    ("simTicks", metrics::SIM_TICKS),
    ("branchPred.lookups", metrics::BP_LOOKUPS),
    ("branchPred.condIncorrect", metrics::BP_COND_INCORRECT),
];

/// Name of the stats file gem5 writes into its output directory.
pub const STATS_FILE: &str = "stats.txt";

fn canonical_name(key: &str) -> Option<&'static str> {
    TRANSLATION.iter().find_map(|&(stat, canonical)| {
        let matches = key == stat
            || key
                .strip_suffix(stat)
                .is_some_and(|prefix| prefix.ends_with('.'));
        matches.then_some(canonical)
    })
}

/// Parse the first statistics dump into a record of canonical metrics.
///
/// Values that are not plain non-negative integers (`nan`, fractions) are
/// ignored and leave the metric absent. Several matching keys, as produced
/// by multi-core systems, are summed.
pub fn parse_stats(text: &str) -> MetricRecord {
    let mut record = MetricRecord::new();
    let mut seen_begin = false;

    for line in text.lines() {
        let line = line.trim();
        if line.contains("Begin Simulation Statistics") {
            if seen_begin {
                break;
            }
            seen_begin = true;
            continue;
        }
        if line.contains("End Simulation Statistics") {
            break;
        }

        let content = line.split('#').next().unwrap_or_default();
        let mut fields = content.split_whitespace();
        let (Some(key), Some(value)) = (fields.next(), fields.next()) else {
            continue;
        };
        let Some(name) = canonical_name(key) else {
            continue;
        };
        if let Ok(value) = value.parse::<u64>() {
            record.accumulate(name, value);
        }
    }

    record
}

/// Read and parse `<outdir>/stats.txt`.
pub fn read_stats(out_dir: &std::path::Path) -> std::io::Result<MetricRecord> {
    let text = std::fs::read_to_string(out_dir.join(STATS_FILE))?;
    Ok(parse_stats(&text))
}
