// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Repository task - the per-repository pipeline state machine
//!
//! Cloned -> Classified -> Transformed -> Verified -> Committed, or
//! Aborted from any intermediate state. Transitions are strictly
//! forward. Local edits exist only in the disposable checkout; the push
//! at the very end is the sole externally visible effect, so entering
//! Aborted never disturbs the remote.

use crate::classify::classify;
use crate::config::MigrationConfig;
use crate::error::MigrationError;
use crate::rules;
use crate::transport::Transport;
use crate::types::{CommitOutcome, RepoDescriptor, TaskResult, VerificationOutcome};
use crate::verify::Verifier;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// One repository's migration pipeline
pub struct RepositoryTask<'a> {
    descriptor: RepoDescriptor,
    cfg: &'a MigrationConfig,
    transport: &'a dyn Transport,
    verifier: &'a dyn Verifier,
}

impl<'a> RepositoryTask<'a> {
    /// Build a task for one descriptor
    #[must_use]
    pub fn new(
        descriptor: RepoDescriptor,
        cfg: &'a MigrationConfig,
        transport: &'a dyn Transport,
        verifier: &'a dyn Verifier,
    ) -> Self {
        Self {
            descriptor,
            cfg,
            transport,
            verifier,
        }
    }

    /// Run the pipeline to a terminal state. Never panics outward; every
    /// failure becomes an `Aborted` commit outcome in the result.
    #[must_use]
    pub fn run(self) -> TaskResult {
        let started = Instant::now();
        let checkout = self.cfg.workspace.join(self.descriptor.workspace_id());

        let mut result = TaskResult {
            url: self.descriptor.url.clone(),
            branch: self.descriptor.branch.clone(),
            classification: None,
            rules_applied: Vec::new(),
            rules_skipped: Vec::new(),
            files_changed: Vec::new(),
            verification: None,
            commit: CommitOutcome::Skipped {
                reason: "not started".to_string(),
            },
            elapsed_ms: 0,
            log: Vec::new(),
        };

        result.commit = match self.execute(&checkout, &mut result) {
            Ok(commit) => commit,
            Err((stage, err)) => {
                warn!("{}: aborted at {stage}: {err}", self.descriptor.url);
                result.log.push(format!("aborted at {stage}: {err}"));
                CommitOutcome::Aborted {
                    stage: stage.to_string(),
                    reason: err.to_string(),
                }
            }
        };

        // The checkout is disposable either way.
        if checkout.exists() {
            let _ = std::fs::remove_dir_all(&checkout);
        }

        result.elapsed_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
        result
    }

    fn execute(
        &self,
        checkout: &Path,
        result: &mut TaskResult,
    ) -> Result<CommitOutcome, (&'static str, MigrationError)> {
        let d = &self.descriptor;

        std::fs::create_dir_all(&self.cfg.workspace).map_err(|e| {
            ("clone", MigrationError::Tool(format!("workspace unavailable: {e}")))
        })?;
        if checkout.exists() {
            let _ = std::fs::remove_dir_all(checkout);
        }

        self.transport
            .clone_repo(&d.url, checkout)
            .map_err(|e| ("clone", MigrationError::Transport(e)))?;
        result.log.push("cloned".to_string());

        self.transport
            .checkout_branch(checkout, &d.branch, true)
            .map_err(|e| ("branch", MigrationError::Transport(e)))?;
        result.log.push(format!("on branch {}", d.branch));

        let classification =
            classify(checkout).map_err(|e| ("classify", e))?;
        result.classification = Some(classification);
        result.log.push(format!("classified as {}", classification.label()));
        info!("{}: {}", d.url, classification.label());

        let set = rules::sets::rule_set(classification, self.cfg)
            .map_err(|e| ("transform", MigrationError::Tool(e.to_string())))?;
        let applied = rules::apply(&set, checkout).map_err(|e| ("transform", e))?;
        result.rules_applied = applied.applied;
        result.rules_skipped = applied.skipped;
        result.files_changed = applied.files_changed;
        result.log.push(format!(
            "transformed: {} applied, {} skipped",
            result.rules_applied.len(),
            result.rules_skipped.len()
        ));

        if self.cfg.dry_run {
            return Ok(CommitOutcome::Skipped {
                reason: "dry run".to_string(),
            });
        }

        if result.files_changed.is_empty() {
            // Re-run on an already-migrated repository.
            return Ok(CommitOutcome::Skipped {
                reason: "no changes needed".to_string(),
            });
        }

        let outcome = self
            .verifier
            .verify(checkout, self.descriptor.cache_dir.as_deref());
        result.verification = Some(outcome.clone());
        match outcome {
            VerificationOutcome::Success => {
                result.log.push("verification passed".to_string());
            }
            VerificationOutcome::Failure { ref log } => {
                self.persist_failure_log(log);
                return Err(("verify", MigrationError::Verification));
            }
            VerificationOutcome::ToolError { reason } => {
                return Err(("verify", MigrationError::Tool(reason)));
            }
        }

        let message = d
            .commit_message
            .clone()
            .unwrap_or_else(|| self.cfg.commit_message.clone());
        let sha = self
            .transport
            .commit_all(checkout, &message)
            .map_err(|e| ("commit", MigrationError::Transport(e)))?;

        let Some(sha) = sha else {
            return Ok(CommitOutcome::Skipped {
                reason: "no changes to commit".to_string(),
            });
        };

        // Push failure after a passed verification is reported on its
        // own stage: local state is correct but unpublished.
        self.transport
            .push(checkout, &d.branch)
            .map_err(|e| ("push", MigrationError::Transport(e)))?;
        result.log.push(format!("pushed {sha}"));

        Ok(CommitOutcome::Committed { sha })
    }

    /// Retain the resolution failure log for the offline aggregator
    fn persist_failure_log(&self, log: &str) {
        let name = self.descriptor.name();
        if std::fs::create_dir_all(&self.cfg.logs_dir).is_err() {
            return;
        }
        let path = self.failure_log_path();
        let body = format!("***** {name} DEPENDENCY RESOLUTION *****\n{log}\n");
        if std::fs::write(&path, body).is_err() {
            warn!("could not write failure log for {name}");
        }
    }

    /// Path of this repository's verification-failure log
    #[must_use]
    pub fn failure_log_path(&self) -> PathBuf {
        self.cfg
            .logs_dir
            .join(format!("dependency-resolution-{}.log", self.descriptor.name()))
    }
}
