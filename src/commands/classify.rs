// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Classify command - reports the migration path for a local checkout

use crate::classify::classify;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Run the classify command
pub fn run(path: PathBuf, json: bool) -> Result<()> {
    let path = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    let classification =
        classify(&path).with_context(|| format!("Failed to classify {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&classification)?);
    } else {
        println!("{}", classification.label());
    }
    Ok(())
}
