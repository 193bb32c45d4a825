// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Unresolved-dependency ledger aggregation
//!
//! An offline pass over per-repository verification-failure logs,
//! independent of the live migration pipeline. Coordinates already in
//! the ledger are skipped; a run that finds nothing new leaves the
//! ledger file byte-for-byte untouched.

use crate::verify::COORDINATE_PATTERN;
use anyhow::{Context, Result};
use chrono::Utc;
use globset::Glob;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::info;

/// A `group:artifact:version` coordinate
pub type Coordinate = (String, String, String);

/// Options for one aggregation run
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Directory holding verification-failure logs
    pub logs_dir: PathBuf,
    /// Glob the log files must match
    pub pattern: String,
    /// Ledger file appended to
    pub output_file: PathBuf,
}

impl AggregateOptions {
    /// Default options rooted at a logs directory
    #[must_use]
    pub fn for_dir(logs_dir: PathBuf) -> Self {
        // Named so the scan pattern can never pick the ledger itself up.
        let output_file = logs_dir.join("aggregated-unresolved-dependencies.log");
        Self {
            logs_dir,
            pattern: "dependency-resolution-*.log".to_string(),
            output_file,
        }
    }
}

/// Summary of one aggregation run
#[derive(Debug, Clone)]
pub struct AggregateSummary {
    /// Log files matching the pattern, coordinate-bearing or not
    pub files_scanned: usize,
    /// Coordinates newly added to the ledger
    pub new_entries: usize,
}

/// Scan the log directory and append new unresolved coordinates, with
/// the repositories observing them, to the ledger.
///
/// # Errors
///
/// I/O failures reading the directory or writing the ledger.
pub fn run(opts: &AggregateOptions) -> Result<AggregateSummary> {
    let (files_scanned, observations) = scan_logs(&opts.logs_dir, &opts.pattern)?;
    let existing = load_existing(&opts.output_file)?;

    // Union repo sets per coordinate across all logs in this run.
    let mut by_coordinate: BTreeMap<Coordinate, BTreeSet<String>> = BTreeMap::new();
    for (repo, coords) in &observations {
        for coord in coords {
            by_coordinate
                .entry(coord.clone())
                .or_default()
                .insert(repo.clone());
        }
    }

    let new_entries: Vec<(&Coordinate, &BTreeSet<String>)> = by_coordinate
        .iter()
        .filter(|(coord, _)| !existing.contains(*coord))
        .collect();

    if new_entries.is_empty() {
        info!("No new unresolved dependencies");
        return Ok(AggregateSummary {
            files_scanned,
            new_entries: 0,
        });
    }

    let ts = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    let mut block = format!("===== Aggregation Run {ts} =====\n");
    block.push_str(&format!(
        "Logs dir: {}\nFiles scanned: {files_scanned}\nNew unique unresolved dependencies: {}\n\n",
        opts.logs_dir.display(),
        new_entries.len()
    ));
    for ((group, artifact, version), repos) in &new_entries {
        let repo_list = repos.iter().cloned().collect::<Vec<_>>().join(", ");
        block.push_str(&format!("- {group}:{artifact}:{version} [repos: {repo_list}]\n"));
    }
    block.push_str("===== End Aggregation =====\n\n");

    append(&opts.output_file, &block)
        .with_context(|| format!("Failed to append to {}", opts.output_file.display()))?;

    info!(
        "Appended {} entries to {}",
        new_entries.len(),
        opts.output_file.display()
    );
    Ok(AggregateSummary {
        files_scanned,
        new_entries: new_entries.len(),
    })
}

/// Collect (repository, coordinates) pairs from matching log files,
/// together with the number of files matched
fn scan_logs(
    logs_dir: &Path,
    pattern: &str,
) -> Result<(usize, Vec<(String, BTreeSet<Coordinate>)>)> {
    let matcher = Glob::new(pattern)
        .with_context(|| format!("Invalid log pattern {pattern}"))?
        .compile_matcher();
    let header_re = Regex::new(r"\*+\s*(.+?)\s*DEPENDENCY RESOLUTION\s*\*+")
        .context("header pattern")?;

    let mut files: Vec<PathBuf> = std::fs::read_dir(logs_dir)
        .with_context(|| format!("Failed to read {}", logs_dir.display()))?
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .is_some_and(|n| matcher.is_match(Path::new(n)))
        })
        .collect();
    files.sort();

    let files_scanned = files.len();
    let mut results = Vec::new();
    for file in files {
        let content = std::fs::read_to_string(&file).unwrap_or_default();
        let repo = header_re
            .captures(&content)
            .and_then(|c| c.get(1))
            .map_or_else(|| repo_from_filename(&file), |m| m.as_str().to_string());
        let coords = extract_coordinates(&content);
        if !coords.is_empty() {
            results.push((repo, coords));
        }
    }
    Ok((files_scanned, results))
}

/// Fall back to the log filename when no header is present
fn repo_from_filename(file: &Path) -> String {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    stem.strip_prefix("dependency-resolution-")
        .map_or(stem.clone(), std::string::ToString::to_string)
}

/// Extract every `group:artifact:version` coordinate from a log
#[must_use]
pub fn extract_coordinates(text: &str) -> BTreeSet<Coordinate> {
    let Ok(re) = Regex::new(COORDINATE_PATTERN) else {
        return BTreeSet::new();
    };
    re.captures_iter(text)
        .map(|c| {
            (
                c[1].to_string(),
                c[2].to_string(),
                c[3].to_string(),
            )
        })
        .collect()
}

/// Coordinates already recorded by prior runs
fn load_existing(ledger: &Path) -> Result<BTreeSet<Coordinate>> {
    if !ledger.exists() {
        return Ok(BTreeSet::new());
    }
    let content = std::fs::read_to_string(ledger)
        .with_context(|| format!("Failed to read {}", ledger.display()))?;
    let re = Regex::new(&format!(r"(?m)^-\s+{COORDINATE_PATTERN}")).context("ledger pattern")?;
    Ok(re
        .captures_iter(&content)
        .map(|c| (c[1].to_string(), c[2].to_string(), c[3].to_string()))
        .collect())
}

fn append(path: &Path, block: &str) -> std::io::Result<()> {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(block.as_bytes())
}
