// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Aggregate command - folds verification-failure logs into the shared ledger

use crate::aggregate::{self, AggregateOptions};
use anyhow::Result;
use std::path::PathBuf;

/// Run the aggregate command
pub fn run(
    logs_dir: PathBuf,
    pattern: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut opts = AggregateOptions::for_dir(logs_dir);
    if let Some(pattern) = pattern {
        opts.pattern = pattern;
    }
    if let Some(output) = output {
        opts.output_file = output;
    }

    let summary = aggregate::run(&opts)?;
    if summary.new_entries == 0 {
        println!(
            "No new unresolved dependencies across {} log file(s)",
            summary.files_scanned
        );
    } else {
        println!(
            "Recorded {} new unresolved dependencies from {} log file(s) in {}",
            summary.new_entries,
            summary.files_scanned,
            opts.output_file.display()
        );
    }
    Ok(())
}
