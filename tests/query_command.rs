// SPDX-License-Identifier: MIT OR Apache-2.0

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn write_file(path: &std::path::Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, content).expect("write file");
}

fn cfind() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cfind"));
    cmd.env("NO_COLOR", "1").env_remove("CFIND_LOG").env_remove("RUST_LOG");
    cmd
}

fn sample_tree() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("src/main.rs"), "fn main() {}\n");
    write_file(&dir.path().join("src/lib.rs"), "pub mod x;\n");
    write_file(&dir.path().join("README.md"), "# sample\n");
    dir
}

#[test]
fn score_ranks_matches_first() {
    let output = cfind()
        .args(["score", "fb", "baz", "foobar", "--format", "json"])
        .output()
        .expect("run score");
    assert!(output.status.success());

    let reports: Value = serde_json::from_slice(&output.stdout).expect("json");
    let reports = reports.as_array().expect("array");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["candidate"], "foobar");
    assert_eq!(reports[0]["matched"], true);
    assert_eq!(reports[0]["positions"], serde_json::json!([0, 3]));
    assert_eq!(reports[1]["candidate"], "baz");
    assert_eq!(reports[1]["matched"], false);
}

#[test]
fn score_reports_exact_matches() {
    cfind()
        .args(["score", "abc", "ABC"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exact"))
        .stdout(predicate::str::contains("ABC"));
}

#[test]
fn query_searches_file_names() {
    let dir = sample_tree();
    let output = cfind()
        .current_dir(dir.path())
        .args(["query", "mn+f", "--format", "json"])
        .output()
        .expect("run query");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["query"], "> mn+f");
    assert_eq!(report["lines"], serde_json::json!(["src/main.rs"]));
    let results = report["results"].as_array().expect("results");
    assert_eq!(results.len(), 1);
    assert!(results[0]["address"]["file"]
        .as_str()
        .expect("file")
        .ends_with("main.rs"));
}

#[test]
fn query_honors_root_and_limit() {
    let dir = sample_tree();
    for i in 0..6 {
        write_file(&dir.path().join(format!("notes/note{i}.txt")), "");
    }
    let output = cfind()
        .args(["--root"])
        .arg(dir.path())
        .args(["--limit", "3", "query", "note+f", "--format", "json"])
        .output()
        .expect("run query");
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["results"].as_array().expect("results").len(), 3);
}

#[test]
fn query_text_output_lists_lines() {
    let dir = sample_tree();
    cfind()
        .current_dir(dir.path())
        .args(["query", "readme+f"])
        .assert()
        .success()
        .stdout(predicate::str::contains("> readme+f"))
        .stdout(predicate::str::contains("README.md"));
}

#[test]
fn unknown_flags_warn_but_still_search() {
    let dir = sample_tree();
    cfind()
        .current_dir(dir.path())
        .args(["query", "mn+fz"])
        .assert()
        .success()
        .stdout(predicate::str::contains("src/main.rs"))
        .stderr(predicate::str::contains("unknown flag: z"));
}

#[test]
fn empty_query_prints_only_the_prompt() {
    let dir = sample_tree();
    let output = cfind()
        .current_dir(dir.path())
        .args(["query", "", "--format", "json"])
        .output()
        .expect("run query");
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["lines"], serde_json::json!([]));
}

#[test]
fn unreadable_config_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    cfind()
        .current_dir(dir.path())
        .args(["--config", "missing.toml", "score", "a", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading config"));
}

#[test]
fn project_config_sets_the_prompt() {
    let dir = sample_tree();
    write_file(&dir.path().join(".cfindrc.toml"), "prompt = \"find: \"\n");
    let output = cfind()
        .current_dir(dir.path())
        .args(["query", "mn+f", "--format", "json"])
        .output()
        .expect("run query");
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["query"], "find: mn+f");
}
