use assert_cmd::prelude::*;
use serde_json::Value;
use std::path::Path;
use std::process::Command;

const STEPS: &str = "\
# smoke
1. Open homepage
2. Verify page contains \"Deals\"
3. Check status 200
4. Juggle oranges
5. Wait 10ms
6. Lighthouse score
";

fn stepdriver(dir: &Path) -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("stepdriver");
    let mut cmd = Command::new(bin);
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("STEP_FROM")
        .env_remove("STEP_TO")
        .env_remove("STEP_MATCH")
        .env_remove("STEPDRIVER_BASE_URL")
        .args(["--config", "absent.yaml", "--log-level", "warn"]);
    cmd
}

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("steps.txt"), STEPS).expect("write steps");
    dir
}

fn stdout(assert: &assert_cmd::assert::Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 output")
}

#[test]
fn audit_reports_coverage_of_discovered_steps_file() {
    let dir = workspace();
    let assert = stepdriver(dir.path()).arg("audit").assert().success();
    let text = stdout(&assert);

    assert!(text.contains("=== NORMALIZED STEPS LIST ==="));
    assert!(text.contains("  1. ✅ Open homepage"));
    assert!(text.contains("  4. ❌ Juggle oranges"));
    assert!(text.contains("Total steps: 6"));
    assert!(text.contains("Coverage: 83.3%"));
    assert!(text.contains("Line 4: \"Juggle oranges\""));
}

#[test]
fn normalize_applies_range_and_keyword() {
    let dir = workspace();
    let assert = stepdriver(dir.path())
        .args(["normalize", "steps.txt", "--from", "2", "--to", "5"])
        .assert()
        .success();
    let text = stdout(&assert);
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "  2. expect page to contain \"Deals\"",
            "  3. Check status 200",
            "  4. Juggle oranges",
            "  5. wait 10",
        ]
    );

    let assert = stepdriver(dir.path())
        .args(["--output", "json", "normalize", "--match", "STATUS"])
        .assert()
        .success();
    let value: Value = serde_json::from_str(&stdout(&assert)).expect("json");
    let items = value.as_array().expect("array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["number"], 3);
}

#[test]
fn dry_run_reports_unknown_lines_without_failing() {
    let dir = workspace();
    let assert = stepdriver(dir.path())
        .args([
            "--output",
            "json",
            "run",
            "--dry-run",
            "--base-url",
            "https://shop.test/",
        ])
        .assert()
        .code(0);
    let report: Value = serde_json::from_str(&stdout(&assert)).expect("json report");
    assert_eq!(report["counts"]["total"], 6);
    assert_eq!(report["counts"]["unknown"], 1);
    assert_eq!(report["counts"]["failed"], 0);
    assert_eq!(report["steps"][5]["status"], "acknowledged");
}

#[test]
fn failed_step_sets_exit_code_one() {
    let dir = workspace();
    std::fs::write(dir.path().join("failing.txt"), "open homepage\ncheck status 404\n").unwrap();
    stepdriver(dir.path())
        .args(["run", "failing.txt", "--dry-run", "--base-url", "https://shop.test/"])
        .assert()
        .code(1);
}

#[test]
fn missing_steps_file_is_a_setup_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    stepdriver(dir.path())
        .args(["run", "nope.txt", "--dry-run"])
        .assert()
        .code(2);
}
