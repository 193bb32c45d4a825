// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Ledger aggregation tests - deduplication across runs and logs, and
//! byte-stability when a run finds nothing new

use gradle_convoy::aggregate::{run, AggregateOptions};
use std::path::Path;
use tempfile::TempDir;

fn write_log(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

fn ledger(opts: &AggregateOptions) -> String {
    std::fs::read_to_string(&opts.output_file).unwrap_or_default()
}

#[test]
fn first_run_records_each_coordinate_once_with_all_observers() {
    let dir = TempDir::new().unwrap();
    write_log(
        dir.path(),
        "dependency-resolution-alpha.log",
        concat!(
            "***** alpha DEPENDENCY RESOLUTION *****\n",
            "> Could not resolve com.example:core:1.2.3\n",
            "> Could not resolve com.example:core:1.2.3\n",
        ),
    );
    write_log(
        dir.path(),
        "dependency-resolution-bravo.log",
        concat!(
            "***** bravo DEPENDENCY RESOLUTION *****\n",
            "> Could not resolve com.example:core:1.2.3\n",
            "> Could not resolve org.acme:widget:0.4.0\n",
        ),
    );

    let opts = AggregateOptions::for_dir(dir.path().to_path_buf());
    let summary = run(&opts).unwrap();
    assert_eq!(summary.files_scanned, 2);
    assert_eq!(summary.new_entries, 2);

    let content = ledger(&opts);
    assert_eq!(content.matches("com.example:core:1.2.3").count(), 1);
    assert!(content.contains("com.example:core:1.2.3 [repos: alpha, bravo]"));
    assert!(content.contains("org.acme:widget:0.4.0 [repos: bravo]"));
}

#[test]
fn rerun_without_new_coordinates_leaves_the_ledger_byte_identical() {
    let dir = TempDir::new().unwrap();
    write_log(
        dir.path(),
        "dependency-resolution-alpha.log",
        "***** alpha DEPENDENCY RESOLUTION *****\n> Could not resolve com.example:core:1.2.3\n",
    );

    let opts = AggregateOptions::for_dir(dir.path().to_path_buf());
    run(&opts).unwrap();
    let first = ledger(&opts);

    let summary = run(&opts).unwrap();
    assert_eq!(summary.new_entries, 0);
    assert_eq!(ledger(&opts), first);
}

#[test]
fn later_runs_append_only_unseen_coordinates() {
    let dir = TempDir::new().unwrap();
    write_log(
        dir.path(),
        "dependency-resolution-alpha.log",
        "***** alpha DEPENDENCY RESOLUTION *****\n> Could not resolve com.example:core:1.2.3\n",
    );
    let opts = AggregateOptions::for_dir(dir.path().to_path_buf());
    run(&opts).unwrap();

    write_log(
        dir.path(),
        "dependency-resolution-charlie.log",
        concat!(
            "***** charlie DEPENDENCY RESOLUTION *****\n",
            "> Could not resolve com.example:core:1.2.3\n",
            "> Could not resolve net.example:plugin:2.0.0\n",
        ),
    );
    let summary = run(&opts).unwrap();
    assert_eq!(summary.new_entries, 1);

    let content = ledger(&opts);
    assert_eq!(content.matches("com.example:core:1.2.3").count(), 1);
    assert!(content.contains("net.example:plugin:2.0.0 [repos: charlie]"));
}

#[test]
fn repository_name_falls_back_to_the_file_name() {
    let dir = TempDir::new().unwrap();
    write_log(
        dir.path(),
        "dependency-resolution-widget.log",
        "> Could not resolve com.example:core:1.2.3\n",
    );

    let opts = AggregateOptions::for_dir(dir.path().to_path_buf());
    run(&opts).unwrap();
    assert!(ledger(&opts).contains("[repos: widget]"));
}

#[test]
fn files_outside_the_pattern_are_ignored() {
    let dir = TempDir::new().unwrap();
    write_log(
        dir.path(),
        "build-output.log",
        "> Could not resolve com.example:core:1.2.3\n",
    );

    let opts = AggregateOptions::for_dir(dir.path().to_path_buf());
    let summary = run(&opts).unwrap();
    assert_eq!(summary.files_scanned, 0);
    assert_eq!(summary.new_entries, 0);
    assert!(!opts.output_file.exists());
}

#[test]
fn coordinate_free_logs_produce_no_ledger() {
    let dir = TempDir::new().unwrap();
    write_log(
        dir.path(),
        "dependency-resolution-alpha.log",
        "***** alpha DEPENDENCY RESOLUTION *****\nBUILD FAILED in 2s\n",
    );

    let opts = AggregateOptions::for_dir(dir.path().to_path_buf());
    let summary = run(&opts).unwrap();
    // The matched file still counts as scanned.
    assert_eq!(summary.files_scanned, 1);
    assert_eq!(summary.new_entries, 0);
    assert!(!opts.output_file.exists());
}
