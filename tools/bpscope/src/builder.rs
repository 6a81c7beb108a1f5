//! Compiling test sources into runnable artifacts.
//!
//! Every regular file directly inside the test directory is a test. Each one
//! is compiled to `<dest>/<file name>.out` with
//! `<compiler> <source> <compiler args...> -o <artifact>`.

use std::path::{Path, PathBuf};
use std::process::Command;

use walkdir::WalkDir;

use crate::config::{self, AnalyzeSettings};
use crate::error::{Error, Result};
use crate::verbose::{dprintln, vprintln, wprintln};

/// Extension appended to a source file name to form its artifact name.
pub const ARTIFACT_SUFFIX: &str = ".out";

/// A compiled test program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Test name: the source file name, extension included.
    pub name: String,
    /// Path of the compiled program.
    pub path: PathBuf,
}

/// Compiler and flags shared by every test in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    pub compiler: String,
    pub flags: Vec<String>,
}

impl BuildSettings {
    pub fn new(compiler: impl Into<String>, flags: Vec<String>) -> Self {
        Self {
            compiler: compiler.into(),
            flags,
        }
    }

    /// Take the compiler from `settings` and shell-split its arguments.
    pub fn from_settings(settings: &AnalyzeSettings) -> Result<Self> {
        if settings.compiler.is_empty() {
            return Err(Error::Config("compiler must not be empty".into()));
        }
        let flags = config::split_words("compiler args", &settings.compiler_args)?;
        Ok(Self::new(settings.compiler.clone(), flags))
    }
}

/// Compiles test sources with fixed [`BuildSettings`].
#[derive(Debug, Clone)]
pub struct Builder {
    settings: BuildSettings,
}

impl Builder {
    pub fn new(settings: BuildSettings) -> Self {
        Self { settings }
    }

    /// Compile every test in `src` into `dest`, creating `dest` if needed.
    ///
    /// Artifacts are returned in file-name order. The first compiler failure
    /// aborts the build.
    pub fn build(&self, src: &Path, dest: &Path) -> Result<Vec<Artifact>> {
        std::fs::create_dir_all(dest).map_err(Error::io(dest))?;

        let sources = discover_tests(src)?;
        let mut artifacts = Vec::with_capacity(sources.len());
        for (name, source) in sources {
            let path = dest.join(format!("{name}{ARTIFACT_SUFFIX}"));
            dprintln!("  Compiling {name}");
            self.compile(&source, &path)?;
            artifacts.push(Artifact { name, path });
        }
        Ok(artifacts)
    }

    fn compile(&self, source: &Path, artifact: &Path) -> Result<()> {
        let mut cmd = self.command(source, artifact);
        vprintln!("    {cmd:?}");

        let output = cmd.output().map_err(|err| Error::Spawn {
            program: self.settings.compiler.clone(),
            source: err,
        })?;
        if !output.status.success() {
            return Err(Error::Build {
                file: source.to_path_buf(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }

    fn command(&self, source: &Path, artifact: &Path) -> Command {
        let mut cmd = Command::new(&self.settings.compiler);
        cmd.arg(source)
            .args(&self.settings.flags)
            .arg("-o")
            .arg(artifact);
        cmd
    }
}

/// List the test sources in `dir`, sorted by file name.
///
/// Only regular files at the top level count. Subdirectories are skipped,
/// and so are hidden files and names that are not valid UTF-8, with a
/// message saying so.
pub fn discover_tests(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut tests = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
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
            wprintln!("skipping {}: file name is not valid UTF-8", entry.path().display());
            continue;
        };
        if name.starts_with('.') {
            vprintln!("  skipping hidden file {name}");
            continue;
        }
        tests.push((name.to_string(), entry.into_path()));
    }
    Ok(tests)
}

/// A test source for the `sh` compiler: `sh <source> -o <artifact>` copies
/// the source, and `sh <artifact>` runs `workload`.
#[cfg(test)]
pub(crate) fn shell_test_source(workload: &str) -> String {
    format!("if [ \"$1\" = -o ]; then exec cp \"$0\" \"$2\"; fi\n{workload}")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn discovers_top_level_files_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("b.c"), "").unwrap();
        std::fs::write(tmp.path().join("a.c"), "").unwrap();
        std::fs::write(tmp.path().join(".hidden"), "").unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("sub/c.c"), "").unwrap();

        let names: Vec<_> = discover_tests(tmp.path())
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, ["a.c", "b.c"]);
    }

    // macOS file systems refuse names that are not valid UTF-8.
    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_names_are_skipped() {
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("good.c"), "").unwrap();
        let bad = std::ffi::OsStr::from_bytes(b"bad\xff.c");
        std::fs::write(tmp.path().join(bad), "").unwrap();
        let names: Vec<_> = discover_tests(tmp.path())
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, ["good.c"]);
    }

    #[test]
    fn missing_test_dir_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = discover_tests(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn command_line_shape() {
        let builder = Builder::new(BuildSettings::new("gcc", vec!["-O2".into(), "-Wall".into()]));
        let cmd = builder.command(Path::new("t/loop.c"), Path::new("o/loop.c.out"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(cmd.get_program(), "gcc");
        assert_eq!(args, ["t/loop.c", "-O2", "-Wall", "-o", "o/loop.c.out"]);
    }

    #[test]
    fn builds_each_test() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("out/.build");
        std::fs::create_dir(&src).unwrap();
        std::fs::write(src.join("one.c"), shell_test_source("exit 0")).unwrap();
        std::fs::write(src.join("two.c"), shell_test_source("exit 0")).unwrap();

        let builder = Builder::new(BuildSettings::new("sh", vec![]));
        let artifacts = builder.build(&src, &dest).unwrap();

        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].name, "one.c");
        assert_eq!(artifacts[0].path, dest.join("one.c.out"));
        assert_eq!(artifacts[1].name, "two.c");
        for artifact in &artifacts {
            assert!(artifact.path.is_file());
        }
    }

    #[test]
    fn compiler_failure_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir(&src).unwrap();
        std::fs::write(src.join("bad.c"), "echo 'syntax error' >&2; exit 1\n").unwrap();

        let builder = Builder::new(BuildSettings::new("sh", vec![]));
        match builder.build(&src, &tmp.path().join("out")) {
            Err(Error::Build { file, code, stderr }) => {
                assert_eq!(file, src.join("bad.c"));
                assert_eq!(code, Some(1));
                assert!(stderr.contains("syntax error"));
            }
            other => panic!("expected build error, got {other:?}"),
        }
    }

    #[test]
    fn missing_compiler_is_spawn_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.c"), "").unwrap();
        let builder = Builder::new(BuildSettings::new("/nonexistent/bpscope-cc", vec![]));
        let err = builder.build(tmp.path(), &tmp.path().join("out")).unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[test]
    fn empty_compiler_rejected() {
        let settings = AnalyzeSettings {
            compiler: String::new(),
            ..AnalyzeSettings::default()
        };
        assert!(matches!(BuildSettings::from_settings(&settings), Err(Error::Config(_))));
    }

    #[test]
    fn settings_split_compiler_args() {
        let settings = AnalyzeSettings {
            compiler: "clang".into(),
            compiler_args: "-O3 -DMSG='hi there'".into(),
            ..AnalyzeSettings::default()
        };
        let build = BuildSettings::from_settings(&settings).unwrap();
        assert_eq!(build.compiler, "clang");
        assert_eq!(build.flags, ["-O3", "-DMSG=hi there"]);
    }
}
