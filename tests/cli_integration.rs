// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Integration tests for the gradle-convoy CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn convoy() -> Command {
    Command::cargo_bin("gradle-convoy").unwrap()
}

fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[test]
fn classify_reports_standard_for_a_plain_repo() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "settings.gradle", "rootProject.name = 'x'\n");
    write_file(dir.path(), "build.gradle", "group = 'com.example'\n");

    convoy()
        .args(["classify"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("standard"));
}

#[test]
fn classify_reports_platform_when_the_marker_is_pinned() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "settings.gradle", "rootProject.name = 'x'\n");
    write_file(
        dir.path(),
        "gradle/libs.versions.toml",
        "[versions]\nplasmaGradlePlugins = \"2.1.0\"\n",
    );

    convoy()
        .args(["classify"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("gradle-platform"));
}

#[test]
fn classify_fails_on_a_non_gradle_directory() {
    let dir = TempDir::new().unwrap();
    convoy().args(["classify"]).arg(dir.path()).assert().failure();
}

#[test]
fn classify_json_emits_a_parseable_value() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "build.gradle", "group = 'com.example'\n");

    let output = convoy()
        .args(["--json", "classify"])
        .arg(dir.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value, serde_json::json!("standard"));
}

#[test]
fn aggregate_folds_logs_into_the_ledger() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "dependency-resolution-widget.log",
        "***** widget DEPENDENCY RESOLUTION *****\n> Could not resolve com.example:core:1.2.3\n",
    );

    convoy()
        .args(["aggregate"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 new unresolved"));

    let ledger = std::fs::read_to_string(
        dir.path().join("aggregated-unresolved-dependencies.log"),
    )
    .unwrap();
    assert!(ledger.contains("com.example:core:1.2.3 [repos: widget]"));
}

#[test]
fn aggregate_reports_nothing_new_on_an_empty_directory() {
    let dir = TempDir::new().unwrap();
    convoy()
        .args(["aggregate"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No new unresolved dependencies"));
}

#[test]
fn migrate_without_repositories_is_an_error() {
    convoy()
        .args(["migrate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No repositories"));
}

#[test]
fn completions_cover_the_subcommands() {
    convoy()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gradle-convoy"));
}
