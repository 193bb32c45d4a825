// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Classifier - selects exactly one migration path per checkout
//!
//! Read-only inspection of a small fixed set of well-known paths.
//! Deterministic and re-entrant: repeated calls on an unmodified tree
//! yield the same classification.

use crate::error::MigrationError;
use crate::templates::{CATALOG_FILE, PLATFORM_MARKER};
use crate::types::Classification;
use regex::Regex;
use std::path::Path;

/// Classify a repository checkout.
///
/// Priority chain, first match wins:
/// 1. Version catalog exists and its `[versions]` section carries the
///    platform plugin-group marker -> `GradlePlatform`
/// 2. Version catalog exists -> `VersionCatalog`
/// 3. Otherwise -> `Standard`
///
/// # Errors
///
/// `MigrationError::Classification` when the checkout has neither a
/// settings file nor a root build file, when the catalog file cannot be
/// read, or when the platform marker is present but outside `[versions]`
/// (markers present but malformed).
pub fn classify(checkout: &Path) -> Result<Classification, MigrationError> {
    // Groovy and Kotlin DSL spellings both count.
    let has_root_file = [
        "settings.gradle",
        "settings.gradle.kts",
        "build.gradle",
        "build.gradle.kts",
    ]
    .iter()
    .any(|name| checkout.join(name).exists());
    if !has_root_file {
        return Err(MigrationError::Classification(
            "no settings or build file at checkout root".to_string(),
        ));
    }

    let catalog_path = checkout.join(CATALOG_FILE);
    if !catalog_path.exists() {
        return Ok(Classification::Standard);
    }

    let content = std::fs::read_to_string(&catalog_path).map_err(|e| {
        MigrationError::Classification(format!("unreadable version catalog: {e}"))
    })?;

    if versions_section(&content)
        .is_some_and(|section| section.contains(PLATFORM_MARKER))
    {
        return Ok(Classification::GradlePlatform);
    }

    // Marker outside [versions] is a contradictory layout, not a
    // catalog-only project.
    if content.contains(PLATFORM_MARKER) {
        return Err(MigrationError::Classification(format!(
            "platform marker {PLATFORM_MARKER} present but outside [versions]"
        )));
    }

    Ok(Classification::VersionCatalog)
}

/// Extract the body of the `[versions]` section, up to the next section
/// header or end of file
fn versions_section(catalog: &str) -> Option<&str> {
    // Section headers sit at line starts; (?s) lets the body span lines.
    let re = Regex::new(r"(?sm)^\[versions\](.*?)(?:^\[|\z)").ok()?;
    re.captures(catalog)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_section_stops_at_next_header() {
        let catalog = "[versions]\nfoo = \"1.0\"\n[libraries]\nbar = \"x\"\n";
        let section = versions_section(catalog).unwrap();
        assert!(section.contains("foo"));
        assert!(!section.contains("bar"));
    }

    #[test]
    fn versions_section_reaches_end_of_file() {
        let catalog = "[versions]\nfoo = \"1.0\"\n";
        assert!(versions_section(catalog).unwrap().contains("foo"));
    }
}
