//! Console logging for bpscope.
//!
//! Three output levels controlled by CLI flags or `--log-level`:
//! - **Quiet** (`-q`, `error`, `warning`): warnings, errors and final summaries only
//! - **Default** (no flag, `info`): per-test progress lines
//! - **Verbose** (`-v`, `debug`): everything, including command lines, settings and timings

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

/// Output verbosity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet = 0,
    Default = 1,
    Verbose = 2,
}

/// Global verbosity level, set once at startup.
static VERBOSITY: AtomicU8 = AtomicU8::new(Verbosity::Default as u8);

impl Verbosity {
    /// Resolve the level from the `-q`/`-v` flags and an optional
    /// `--log-level` name (`error`, `warning`, `info`, `debug`).
    ///
    /// An explicit flag wins over the log level; an unknown level name falls
    /// back to the default.
    pub fn from_flags(quiet: bool, verbose: bool, log_level: Option<&str>) -> Self {
        if quiet {
            return Self::Quiet;
        }
        if verbose {
            return Self::Verbose;
        }
        match log_level.map(str::to_ascii_lowercase).as_deref() {
            Some("critical" | "error" | "warning" | "warn") => Self::Quiet,
            Some("debug") => Self::Verbose,
            _ => Self::Default,
        }
    }
}

/// Set the verbosity level for the current process.
pub fn init(level: Verbosity) {
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

/// Returns the current verbosity level.
pub fn verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        0 => Verbosity::Quiet,
        2 => Verbosity::Verbose,
        _ => Verbosity::Default,
    }
}

/// Returns `true` if verbose mode is active.
pub fn is_verbose() -> bool {
    verbosity() == Verbosity::Verbose
}

/// Returns `true` if quiet mode is active.
pub fn is_quiet() -> bool {
    verbosity() == Verbosity::Quiet
}

/// Print a message only when verbose mode is enabled.
///
/// ```ignore
/// vprintln!("  {}", command_line);
/// ```
macro_rules! vprintln {
    ($($arg:tt)*) => {
        if $crate::verbose::is_verbose() {
            println!($($arg)*);
        }
    };
}

pub(crate) use vprintln;

/// Print a message at default verbosity and above (suppressed in quiet mode).
///
/// ```ignore
/// dprintln!("  Running {}...", name);
/// ```
macro_rules! dprintln {
    ($($arg:tt)*) => {
        if !$crate::verbose::is_quiet() {
            println!($($arg)*);
        }
    };
}

pub(crate) use dprintln;

/// Print a warning to stderr regardless of verbosity.
macro_rules! wprintln {
    ($($arg:tt)*) => {{
        eprintln!("warning: {}", format_args!($($arg)*));
    }};
}

pub(crate) use wprintln;

/// RAII timer that prints elapsed duration on drop when verbose mode is active.
///
/// ```ignore
/// let _t = Timer::start("build");
/// // ... work ...
/// // prints "  build: 42ms" on drop
/// ```
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    /// Begin timing a labeled operation.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if is_verbose() {
            let elapsed = self.start.elapsed();
            println!("  {}: {:.1?}", self.label, elapsed);
        }
    }
}
