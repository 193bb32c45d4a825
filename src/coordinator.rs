// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Migration coordinator - bounded-concurrency batch execution
//!
//! One repository task per descriptor, each on its own worker with its
//! own checkout and (for batches larger than one) its own resolution
//! cache directory. A failing or panicking task never cancels or
//! corrupts its siblings; the report always carries exactly one entry
//! per descriptor.

use crate::config::MigrationConfig;
use crate::task::RepositoryTask;
use crate::transport::Transport;
use crate::types::{MigrationReport, RepoDescriptor, TaskResult};
use crate::verify::Verifier;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Runs repository tasks under a bounded worker pool and aggregates
/// their results
pub struct Coordinator {
    cfg: Arc<MigrationConfig>,
    transport: Arc<dyn Transport>,
    verifier: Arc<dyn Verifier>,
}

impl Coordinator {
    /// Build a coordinator over the given collaborators
    #[must_use]
    pub fn new(
        cfg: MigrationConfig,
        transport: Arc<dyn Transport>,
        verifier: Arc<dyn Verifier>,
    ) -> Self {
        Self {
            cfg: Arc::new(cfg),
            transport,
            verifier,
        }
    }

    /// Run the whole batch to completion and produce the report.
    ///
    /// Waits for every task to reach a terminal state; no overall
    /// deadline is imposed.
    pub async fn run(&self, descriptors: Vec<RepoDescriptor>) -> MigrationReport {
        let started_at = Utc::now();
        let limit = self.cfg.max_workers.max(1);
        info!(
            "Migrating {} repositories with {limit} workers",
            descriptors.len()
        );

        let isolate_caches = descriptors.len() > 1;
        let semaphore = Arc::new(Semaphore::new(limit));
        let results: Arc<Mutex<Vec<TaskResult>>> = Arc::new(Mutex::new(Vec::new()));
        let mut join_set = JoinSet::new();

        for mut descriptor in descriptors {
            if isolate_caches && descriptor.cache_dir.is_none() {
                descriptor.cache_dir = Some(
                    self.cfg
                        .workspace
                        .join("caches")
                        .join(descriptor.workspace_id()),
                );
            }

            let cfg = Arc::clone(&self.cfg);
            let transport = Arc::clone(&self.transport);
            let verifier = Arc::clone(&self.verifier);
            let semaphore = Arc::clone(&semaphore);
            let results = Arc::clone(&results);

            join_set.spawn(async move {
                // A closed semaphore cannot happen here; treat it as a
                // worker slot and keep going.
                let _permit = semaphore.acquire_owned().await;

                let url = descriptor.url.clone();
                let branch = descriptor.branch.clone();

                let outcome = tokio::task::spawn_blocking(move || {
                    RepositoryTask::new(
                        descriptor,
                        &cfg,
                        transport.as_ref(),
                        verifier.as_ref(),
                    )
                    .run()
                })
                .await;

                let result = match outcome {
                    Ok(result) => result,
                    Err(join_err) => {
                        // Fault isolation: a panicking task still yields
                        // exactly one report entry.
                        error!("{url}: worker failed: {join_err}");
                        TaskResult::aborted(
                            &url,
                            &branch,
                            "transform",
                            format!("worker panicked: {join_err}"),
                        )
                    }
                };

                // A poisoned lock still holds every prior result; keep
                // appending so the report stays one entry per descriptor.
                results
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push(result);
            });
        }

        while join_set.join_next().await.is_some() {}

        let mut guard = results
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let results = std::mem::take(&mut *guard);
        drop(guard);

        let report = MigrationReport {
            started_at,
            finished_at: Utc::now(),
            results,
        };
        info!(
            "Batch complete: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }
}
