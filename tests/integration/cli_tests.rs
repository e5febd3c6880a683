//! CLI integration tests
//!
//! These tests verify that the binary wires discovery, analysis and output
//! together.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn apkunbox() -> Command {
    Command::cargo_bin("apkunbox").unwrap()
}

/// The single `unboxing_results_*` directory a run created
fn run_dir(out: &Path) -> PathBuf {
    let dirs: Vec<PathBuf> = fs::read_dir(out)
        .unwrap()
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with("unboxing_results_"))
                .unwrap_or(false)
        })
        .collect();
    assert_eq!(dirs.len(), 1, "expected one run directory in {:?}", out);
    dirs.into_iter().next().unwrap()
}

#[test]
fn test_help() {
    apkunbox()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--blacklist"))
        .stdout(predicate::str::contains("--no-synthesis"));
}

#[test]
fn test_missing_arguments() {
    apkunbox().assert().failure();
}

#[test]
fn test_missing_input_directory() {
    let out = TempDir::new().unwrap();
    apkunbox()
        .arg(out.path().join("nope"))
        .arg(out.path())
        .arg("--quiet")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input directory does not exist"));
}

#[test]
fn test_terminal_run() {
    let out = TempDir::new().unwrap();

    apkunbox()
        .arg(fixtures_path())
        .arg(out.path())
        .args(["--threads", "2", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Analyzed 2 packages"))
        .stdout(predicate::str::contains("com.app"))
        .stdout(predicate::str::contains("MANAGED"));

    let run = run_dir(out.path());
    let table = fs::read_to_string(run.join("combined_table.tsv")).unwrap();
    assert_eq!(table.lines().count(), 3);
    assert!(run.join("results").join("stubapp.txt").is_file());
    assert!(run.join("logs").join("plainapp.txt").is_file());
    assert!(run
        .join("unpackers")
        .join("stubapp")
        .join("Unpacker_stubapp.java")
        .is_file());
}

#[test]
fn test_json_run_without_synthesis() {
    let out = TempDir::new().unwrap();

    apkunbox()
        .arg(fixtures_path())
        .arg(out.path())
        .args(["--format", "json", "--no-synthesis", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Report written to:"));

    let run = run_dir(out.path());
    let json = fs::read_to_string(run.join("summary.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["summary"]["total"], 2);
    assert_eq!(value["summary"]["unpackers"], 0);
    assert!(!run.join("unpackers").exists());
}

#[test]
fn test_blacklist_file() {
    let out = TempDir::new().unwrap();
    let blacklist = out.path().join("done.txt");
    fs::write(&blacklist, "stubapp.txt\n").unwrap();
    let results = out.path().join("results");

    apkunbox()
        .arg(fixtures_path())
        .arg(&results)
        .arg("--blacklist")
        .arg(&blacklist)
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains("Analyzed 1 packages"));

    let run = run_dir(&results);
    assert!(!run.join("results").join("stubapp.txt").exists());
    assert!(run.join("results").join("plainapp.txt").is_file());
}
