// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Gradle-convoy library - batch migration of Gradle fleets to a new
//! artifact backend
//!
//! This crate provides the migration orchestration engine: per-repository
//! classification, ordered idempotent build-file transformations, a
//! dependency-resolution verification gate, and a bounded-concurrency
//! coordinator that runs the pipeline across many repositories and
//! aggregates the outcomes.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregate;
pub mod classify;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod rules;
pub mod task;
pub mod templates;
pub mod transport;
pub mod verify;

/// Core data types for the migration pipeline
pub mod types {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use sha2::{Digest, Sha256};

    // =========================================================================
    // Repository Descriptor
    // =========================================================================

    /// Identity of one migration unit. Immutable once a task starts.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct RepoDescriptor {
        /// Source URL (SSH preferred; HTTPS is converted by the transport)
        pub url: String,
        /// Branch the migration is committed to
        pub branch: String,
        /// Per-repository commit message override
        pub commit_message: Option<String>,
        /// Per-repository resolution cache directory override
        pub cache_dir: Option<std::path::PathBuf>,
    }

    impl RepoDescriptor {
        /// Create a descriptor with the batch-level branch name
        #[must_use]
        pub fn new(url: impl Into<String>, branch: impl Into<String>) -> Self {
            Self {
                url: url.into(),
                branch: branch.into(),
                commit_message: None,
                cache_dir: None,
            }
        }

        /// Short repository name derived from the URL
        #[must_use]
        pub fn name(&self) -> String {
            self.url
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(&self.url)
                .trim_end_matches(".git")
                .to_string()
        }

        /// Deterministic workspace identifier for this repository
        #[must_use]
        pub fn workspace_id(&self) -> String {
            let mut hasher = Sha256::new();
            hasher.update(self.url.as_bytes());
            let hash = hex::encode(hasher.finalize());
            format!("{}-{}", self.name(), &hash[..12])
        }
    }

    // =========================================================================
    // Classification
    // =========================================================================

    /// The migration path a repository follows. Derived once per task;
    /// never changes during a run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub enum Classification {
        /// Plain Gradle project: settings file, wrapper, root build file
        Standard,
        /// Version catalog present with the platform plugin-group marker
        GradlePlatform,
        /// Version catalog present without the platform marker
        VersionCatalog,
    }

    impl Classification {
        /// Human-readable label used in reports
        #[must_use]
        pub fn label(&self) -> &'static str {
            match self {
                Self::Standard => "standard",
                Self::GradlePlatform => "gradle-platform",
                Self::VersionCatalog => "version-catalog",
            }
        }
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Outcome of the external dependency-resolution check
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "outcome", rename_all = "snake_case")]
    pub enum VerificationOutcome {
        /// All declared dependencies resolved
        Success,
        /// Resolution failed with recognizable dependency coordinates
        Failure {
            /// Combined tool output, retained for the aggregator
            log: String,
        },
        /// The tool crashed, timed out, or could not be invoked
        ToolError {
            /// Why the check is indeterminate
            reason: String,
        },
    }

    impl VerificationOutcome {
        /// Whether this outcome permits the commit step
        #[must_use]
        pub fn permits_commit(&self) -> bool {
            matches!(self, Self::Success)
        }
    }

    // =========================================================================
    // Task Result
    // =========================================================================

    /// Terminal commit decision for one repository
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "commit", rename_all = "snake_case")]
    pub enum CommitOutcome {
        /// Changes committed and pushed
        Committed {
            /// Commit SHA on the migration branch
            sha: String,
        },
        /// Pipeline completed but nothing needed committing
        Skipped {
            /// Why there was nothing to commit
            reason: String,
        },
        /// Task aborted before or instead of the push
        Aborted {
            /// Pipeline stage the abort happened in
            stage: String,
            /// Error kind and message
            reason: String,
        },
    }

    /// Terminal record for one repository. Owned by the coordinator once
    /// the task has settled.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TaskResult {
        /// Repository URL
        pub url: String,
        /// Branch the migration targeted
        pub branch: String,
        /// Classification used, when the task got that far
        pub classification: Option<Classification>,
        /// Rule ids that performed an edit
        #[serde(default)]
        pub rules_applied: Vec<String>,
        /// Rule ids recorded as no-ops (already applied)
        #[serde(default)]
        pub rules_skipped: Vec<String>,
        /// Files changed in the checkout, relative to its root
        #[serde(default)]
        pub files_changed: Vec<String>,
        /// Verification outcome, when the gate was reached
        pub verification: Option<VerificationOutcome>,
        /// Terminal commit decision
        pub commit: CommitOutcome,
        /// Wall-clock duration of the task in milliseconds
        pub elapsed_ms: i64,
        /// Captured progress log
        #[serde(default)]
        pub log: Vec<String>,
    }

    impl TaskResult {
        /// Whether the task reached a successful terminal state
        #[must_use]
        pub fn is_success(&self) -> bool {
            matches!(
                self.commit,
                CommitOutcome::Committed { .. } | CommitOutcome::Skipped { .. }
            )
        }

        /// Synthesize an aborted result for a task that never produced one
        /// (e.g. a panicked worker)
        #[must_use]
        pub fn aborted(url: &str, branch: &str, stage: &str, reason: String) -> Self {
            Self {
                url: url.to_string(),
                branch: branch.to_string(),
                classification: None,
                rules_applied: Vec::new(),
                rules_skipped: Vec::new(),
                files_changed: Vec::new(),
                verification: None,
                commit: CommitOutcome::Aborted {
                    stage: stage.to_string(),
                    reason,
                },
                elapsed_ms: 0,
                log: Vec::new(),
            }
        }
    }

    // =========================================================================
    // Migration Report
    // =========================================================================

    /// Aggregate of all task results for one batch run
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MigrationReport {
        /// When the batch started
        pub started_at: DateTime<Utc>,
        /// When the last task settled
        pub finished_at: DateTime<Utc>,
        /// One entry per repository descriptor, in completion order
        pub results: Vec<TaskResult>,
    }

    impl MigrationReport {
        /// Number of repositories that committed or skipped cleanly
        #[must_use]
        pub fn succeeded(&self) -> usize {
            self.results.iter().filter(|r| r.is_success()).count()
        }

        /// Number of aborted repositories
        #[must_use]
        pub fn failed(&self) -> usize {
            self.results.len() - self.succeeded()
        }

        /// Render the report as Markdown
        #[must_use]
        pub fn to_markdown(&self) -> String {
            use std::fmt::Write;

            let mut out = String::new();
            out.push_str("# Gradle Backend Migration Report\n");
            let _ = writeln!(
                out,
                "Generated on: {}\n",
                self.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            out.push_str("## Summary\n");
            let _ = writeln!(out, "- Total repositories: {}", self.results.len());
            let _ = writeln!(out, "- Succeeded: {}", self.succeeded());
            let _ = writeln!(out, "- Failed: {}\n", self.failed());
            out.push_str("## Detailed Results\n\n");

            for result in &self.results {
                let status = if result.is_success() { "OK" } else { "FAILED" };
                let _ = writeln!(out, "### [{status}] {}", result.url);
                if let Some(class) = result.classification {
                    let _ = writeln!(out, "**Classification:** {}", class.label());
                }
                match &result.commit {
                    CommitOutcome::Committed { sha } => {
                        let _ = writeln!(out, "**Committed:** {sha}");
                    }
                    CommitOutcome::Skipped { reason } => {
                        let _ = writeln!(out, "**Skipped:** {reason}");
                    }
                    CommitOutcome::Aborted { stage, reason } => {
                        let _ = writeln!(out, "**Aborted at {stage}:** {reason}");
                    }
                }
                if !result.rules_applied.is_empty() {
                    out.push_str("**Rules applied:**\n");
                    for rule in &result.rules_applied {
                        let _ = writeln!(out, "- {rule}");
                    }
                }
                let _ = writeln!(out, "**Elapsed:** {}ms\n", result.elapsed_ms);
            }

            out
        }
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::types::*;
    pub use anyhow::{Context, Result};
}
