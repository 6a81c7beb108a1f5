//! Integration tests for the bpscope binary.
//!
//! These run `bpscope` as a subprocess against scratch directories. `sh`
//! stands in for the compiler: each test source copies itself when invoked
//! as `sh <source> -o <artifact>` and runs its workload otherwise. A small
//! shell script stands in for `perf`.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const FAKE_PERF: &str = r#"
report="$5"
artifact="$7"
sh "$artifact" || exit $?
printf '%s\n' \
    " Performance counter stats for '$artifact':" \
    "" \
    "         1,000      cycles" \
    "           100      branches" \
    "            10      branch-misses" > "$report"
"#;

fn bpscope_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_bpscope"))
}

/// Scratch project with a `tests/` directory and a fake perf.
struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        std::fs::create_dir(dir.path().join("tests")).expect("failed to create tests/");
        std::fs::write(dir.path().join("perf.sh"), FAKE_PERF).expect("failed to write fake perf");
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn add_test(&self, name: &str, workload: &str) {
        let source = format!("if [ \"$1\" = -o ]; then exec cp \"$0\" \"$2\"; fi\n{workload}\n");
        std::fs::write(self.root().join("tests").join(name), source).expect("failed to write test");
    }

    fn remove_test(&self, name: &str) {
        std::fs::remove_file(self.root().join("tests").join(name)).expect("failed to remove test");
    }

    fn analyze(&self, extra: &[&str]) -> Output {
        Command::new(bpscope_binary())
            .current_dir(self.root())
            .args(["analyze", "--compiler", "sh", "--perf-bin", "sh perf.sh", "--timeout", "0.5"])
            .args(extra)
            .output()
            .expect("failed to execute bpscope analyze")
    }

    fn record(&self, name: &str) -> serde_json::Value {
        let text = std::fs::read_to_string(self.root().join("analyze").join(name))
            .unwrap_or_else(|e| panic!("missing record {name}: {e}"));
        serde_json::from_str(&text).expect("record is not JSON")
    }

    fn records(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.root().join("analyze"))
            .expect("output dir missing")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "bpscope failed (exit={:?}):\nstdout:\n{}\nstderr:\n{}",
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr),
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn analyze_writes_one_record_per_test() {
    let project = Project::new();
    project.add_test("branchy.c", "exit 0");
    project.add_test("straight.c", "exit 0");

    let output = project.analyze(&[]);
    assert_success(&output);

    assert_eq!(project.records(), ["branchy.c", "straight.c"]);
    assert_eq!(
        project.record("branchy.c"),
        serde_json::json!({
            "simTicks": 1000,
            "branchPred.lookups": 100,
            "branchPred.condIncorrect": 10,
        })
    );
}

#[test]
fn second_run_clears_previous_output() {
    let project = Project::new();
    project.add_test("first.c", "exit 0");
    assert_success(&project.analyze(&[]));

    project.remove_test("first.c");
    project.add_test("second.c", "exit 0");
    assert_success(&project.analyze(&[]));

    assert_eq!(project.records(), ["second.c"]);
}

#[test]
fn empty_test_dir_succeeds() {
    let project = Project::new();
    assert_success(&project.analyze(&[]));
    assert!(project.records().is_empty());
}

#[test]
fn timeout_and_crash_are_recorded() {
    let project = Project::new();
    project.add_test("hang.c", "sleep 30");
    project.add_test("crash.c", "exit 3");

    let output = project.analyze(&["--jobs", "2"]);
    assert_success(&output);

    assert_eq!(project.record("hang.c"), serde_json::json!({ "run.timedOut": 1 }));
    assert_eq!(
        project.record("crash.c"),
        serde_json::json!({ "run.crashed": 1, "run.exitCode": 3 })
    );
}

#[test]
fn unknown_profiler_fails() {
    let project = Project::new();
    let output = project.analyze(&["--profiler", "valgrind"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown profiler"), "stderr:\n{stderr}");
}

#[test]
fn build_failure_names_the_file() {
    let project = Project::new();
    std::fs::write(project.root().join("tests/broken.c"), "exit 1\n").expect("failed to write test");
    let output = project.analyze(&[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("broken.c"), "stderr:\n{stderr}");
}

#[test]
fn config_file_supplies_settings() {
    let project = Project::new();
    project.add_test("a.c", "exit 0");
    std::fs::write(
        project.root().join("bpscope.toml"),
        "out_dir = \"from-config\"\ncompiler = \"sh\"\nperf_bin = \"sh perf.sh\"\n",
    )
    .expect("failed to write config");

    let output = Command::new(bpscope_binary())
        .current_dir(project.root())
        .args(["analyze", "--config-file", "bpscope.toml"])
        .output()
        .expect("failed to execute bpscope analyze");
    assert_success(&output);
    assert!(project.root().join("from-config/a.c").is_file());
}

#[test]
fn summarize_aggregates_directories() {
    let project = Project::new();
    for (dir, lookups, incorrect) in [("perf-a", 100, 5), ("perf-b", 200, 40)] {
        let path = project.root().join("runs").join(dir);
        std::fs::create_dir_all(&path).expect("failed to create record dir");
        std::fs::write(
            path.join("t.c"),
            format!(
                "{{\"simTicks\": 1000, \"branchPred.lookups\": {lookups}, \"branchPred.condIncorrect\": {incorrect}}}"
            ),
        )
        .expect("failed to write record");
    }

    let output = Command::new(bpscope_binary())
        .current_dir(project.root())
        .args([
            "summarize",
            "--src-dirs",
            "runs/perf-a",
            "runs/perf-b",
            "--out-dir",
            "summary",
            "--no-show-graph",
        ])
        .output()
        .expect("failed to execute bpscope summarize");
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Overall BP incorrect %: 15.00"), "stdout:\n{stdout}");
    assert!(project.root().join("summary/results.data").is_file());
    assert!(project.root().join("summary/graph.txt").is_file());
}

#[test]
fn summarize_without_data() {
    let project = Project::new();
    let output = Command::new(bpscope_binary())
        .current_dir(project.root())
        .args(["summarize", "--src-dirs", "missing"])
        .output()
        .expect("failed to execute bpscope summarize");
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("No data to summarize"));
}
