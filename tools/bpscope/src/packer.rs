//! Persisting analysis results, one JSON file per test.
//!
//! A record is stored at `<out dir>/<test name>` as a flat JSON object of
//! metric names to integers.

use std::path::Path;

use bpscope_perf::metrics::{AnalysisResult, MetricRecord};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::verbose::vprintln;

/// Write every record in `result` to its own file in `out_dir`.
///
/// `out_dir` is created if absent. Existing files with the same names are
/// overwritten; other files are left alone.
pub fn pack(out_dir: &Path, result: &AnalysisResult) -> Result<()> {
    std::fs::create_dir_all(out_dir).map_err(Error::io(out_dir))?;
    for (name, record) in result {
        let path = out_dir.join(name);
        let json = serde_json::to_string_pretty(record).map_err(|err| Error::Serialize {
            path: path.clone(),
            source: err,
        })?;
        std::fs::write(&path, json + "\n").map_err(Error::io(&path))?;
        vprintln!("  wrote {}", path.display());
    }
    Ok(())
}

/// Read back every record file directly inside `dir`.
///
/// Subdirectories and hidden files are ignored.
pub fn unpack(dir: &Path) -> Result<AnalysisResult> {
    let mut result = AnalysisResult::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            Error::Io {
                path,
                source: e.into(),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        let path = entry.path();
        let text = std::fs::read_to_string(path).map_err(Error::io(path))?;
        let record: MetricRecord = serde_json::from_str(&text).map_err(|err| Error::Serialize {
            path: path.to_path_buf(),
            source: err,
        })?;
        result.insert(name.to_string(), record);
    }
    Ok(result)
}
