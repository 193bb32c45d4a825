// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Verification gate - the single check between transformation and commit
//!
//! Runs the build tool's dependency-resolution command against the
//! mutated tree with a forced network refresh. `Success` is the only
//! outcome that permits the commit step.

use crate::types::VerificationOutcome;
use regex::Regex;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

/// Pattern recognizing `group:artifact:version` coordinates in tool output
pub const COORDINATE_PATTERN: &str =
    r"([A-Za-z0-9_.-]+):([A-Za-z0-9_.-]+):([A-Za-z0-9_.-]+)";

/// Seam for the external resolution check, so tests can substitute a
/// recorded outcome
pub trait Verifier: Send + Sync {
    /// Run the dependency-resolution check against a checkout.
    /// `cache_dir` is the task's private resolution cache, when assigned.
    fn verify(&self, checkout: &Path, cache_dir: Option<&Path>) -> VerificationOutcome;
}

/// Invokes the Gradle dependency-resolution command as a subprocess
#[derive(Debug, Default, Clone)]
pub struct GradleVerifier;

impl Verifier for GradleVerifier {
    fn verify(&self, checkout: &Path, cache_dir: Option<&Path>) -> VerificationOutcome {
        let program = resolve_tool(checkout);
        info!("Verifying dependency resolution with {program}");

        let mut command = Command::new(&program);
        command
            .args(["dependencies", "--refresh-dependencies", "--no-daemon"])
            .current_dir(checkout);
        if let Some(cache) = cache_dir {
            // Private cache avoids lock contention on the shared one.
            command.env("GRADLE_USER_HOME", cache);
        }

        let output = match command.output() {
            Ok(out) => out,
            Err(e) => {
                return VerificationOutcome::ToolError {
                    reason: format!("failed to invoke {program}: {e}"),
                };
            }
        };

        let mut log = String::from_utf8_lossy(&output.stdout).to_string();
        log.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            debug!("Dependency resolution succeeded");
            return VerificationOutcome::Success;
        }

        if contains_coordinates(&log) {
            VerificationOutcome::Failure {
                log: truncate_log(log),
            }
        } else {
            VerificationOutcome::ToolError {
                reason: format!(
                    "resolution tool exited with {} and no recognizable failures",
                    output.status
                ),
            }
        }
    }
}

/// Prefer the repository's own wrapper; fall back to a system Gradle
fn resolve_tool(checkout: &Path) -> String {
    if cfg!(windows) && checkout.join("gradlew.bat").exists() {
        return checkout.join("gradlew.bat").to_string_lossy().to_string();
    }
    if !cfg!(windows) && checkout.join("gradlew").exists() {
        return checkout.join("gradlew").to_string_lossy().to_string();
    }
    "gradle".to_string()
}

/// Whether the log carries parseable dependency coordinates
#[must_use]
pub fn contains_coordinates(log: &str) -> bool {
    Regex::new(COORDINATE_PATTERN)
        .map(|re| re.is_match(log))
        .unwrap_or(false)
}

/// Keep failure logs to a manageable tail
fn truncate_log(log: String) -> String {
    const MAX: usize = 16 * 1024;
    if log.len() <= MAX {
        return log;
    }
    let start = log.len() - MAX;
    // Cut on a char boundary.
    let start = (start..log.len())
        .find(|i| log.is_char_boundary(*i))
        .unwrap_or(start);
    log[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_are_recognized() {
        assert!(contains_coordinates(
            "Could not resolve com.example:widget:1.2.3"
        ));
        assert!(!contains_coordinates("permission denied"));
    }

    #[test]
    fn truncation_keeps_the_tail() {
        let log = format!("{}END", "x".repeat(40_000));
        let out = truncate_log(log);
        assert!(out.len() <= 16 * 1024);
        assert!(out.ends_with("END"));
    }
}
