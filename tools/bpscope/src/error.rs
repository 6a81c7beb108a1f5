//! Error types for the analysis pipeline.
//!
//! Only fatal conditions are errors. A test that times out or crashes is
//! recorded in its [`MetricRecord`](bpscope_perf::metrics::MetricRecord)
//! and a counter that cannot be parsed is simply absent.

use std::io;
use std::path::PathBuf;

/// Fatal errors that stop an analysis run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration, e.g. an unknown profiler name.
    #[error("configuration error: {0}")]
    Config(String),

    /// The compiler exited unsuccessfully.
    #[error("failed to compile '{}' (exit code {}):\n{stderr}", file.display(), code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    Build {
        file: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    /// An external program could not be started.
    #[error("failed to run '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// A file or directory could not be read or written.
    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A record could not be encoded or decoded.
    #[error("malformed record {}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Build a closure mapping an `io::Error` on `path` into [`Error::Io`].
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
