// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Pipeline gating tests - commit/push only happen after a passed
//! verification, and one repository's failure never leaks into another

use gradle_convoy::config::MigrationConfig;
use gradle_convoy::coordinator::Coordinator;
use gradle_convoy::error::TransportError;
use gradle_convoy::task::RepositoryTask;
use gradle_convoy::transport::Transport;
use gradle_convoy::types::{CommitOutcome, RepoDescriptor, VerificationOutcome};
use gradle_convoy::verify::Verifier;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// =============================================================================
// Stubs
// =============================================================================

/// Transport that materializes checkouts from a local fixture and
/// records every commit and push
struct FixtureTransport {
    fixture: PathBuf,
    commits: Mutex<Vec<String>>,
    pushes: Mutex<Vec<String>>,
    clean_tree: bool,
}

impl FixtureTransport {
    fn new(fixture: PathBuf) -> Self {
        Self {
            fixture,
            commits: Mutex::new(Vec::new()),
            pushes: Mutex::new(Vec::new()),
            clean_tree: false,
        }
    }

    fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }
}

fn copy_tree(from: &Path, to: &Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in walkdir::WalkDir::new(from) {
        let entry = entry.unwrap();
        let rel = entry.path().strip_prefix(from).unwrap();
        if rel.as_os_str().is_empty() {
            continue;
        }
        let dest = to.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest).unwrap();
        } else {
            std::fs::copy(entry.path(), &dest).unwrap();
        }
    }
}

impl Transport for FixtureTransport {
    fn clone_repo(&self, _url: &str, dest: &Path) -> Result<(), TransportError> {
        copy_tree(&self.fixture, dest);
        Ok(())
    }

    fn checkout_branch(
        &self,
        _checkout: &Path,
        _branch: &str,
        _create: bool,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    fn commit_all(
        &self,
        _checkout: &Path,
        message: &str,
    ) -> Result<Option<String>, TransportError> {
        self.commits.lock().unwrap().push(message.to_string());
        if self.clean_tree {
            return Ok(None);
        }
        Ok(Some("deadbeef1234".to_string()))
    }

    fn push(&self, _checkout: &Path, branch: &str) -> Result<(), TransportError> {
        self.pushes.lock().unwrap().push(branch.to_string());
        Ok(())
    }
}

/// Verifier returning a canned outcome, counting invocations
struct CannedVerifier {
    outcome: VerificationOutcome,
    calls: AtomicUsize,
}

impl CannedVerifier {
    fn new(outcome: VerificationOutcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Verifier for CannedVerifier {
    fn verify(&self, _checkout: &Path, _cache_dir: Option<&Path>) -> VerificationOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Verifier that panics for one repository, by checkout path substring
struct SelectivePanicVerifier {
    panic_on: String,
}

impl Verifier for SelectivePanicVerifier {
    fn verify(&self, checkout: &Path, _cache_dir: Option<&Path>) -> VerificationOutcome {
        if checkout.to_string_lossy().contains(&self.panic_on) {
            panic!("injected fault");
        }
        VerificationOutcome::Success
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn fixture_repo(root: &Path) {
    let write = |rel: &str, content: &str| {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    };
    write("settings.gradle", "rootProject.name = 'widget'\n");
    write(
        "build.gradle",
        "apply plugin: 'com.bmuschko.nexus'\n\ngroup = 'com.example'\n",
    );
    write(
        "gradle/wrapper/gradle-wrapper.properties",
        "distributionUrl=https://services.gradle.org/distributions/gradle-7.4-bin.zip\n",
    );
}

fn test_setup(workspace: &TempDir) -> (MigrationConfig, PathBuf) {
    let fixture = workspace.path().join("fixture");
    fixture_repo(&fixture);
    let cfg = MigrationConfig {
        backend_url: "https://repo.example/artifactory".to_string(),
        workspace: workspace.path().join("work"),
        logs_dir: workspace.path().join("logs"),
        ..MigrationConfig::default()
    };
    (cfg, fixture)
}

fn descriptor(name: &str, branch: &str) -> RepoDescriptor {
    RepoDescriptor {
        url: format!("https://example.com/{name}.git"),
        branch: branch.to_string(),
        commit_message: None,
        cache_dir: None,
    }
}

// =============================================================================
// Single-task gating
// =============================================================================

#[test]
fn passed_verification_leads_to_commit_and_push() {
    let workspace = TempDir::new().unwrap();
    let (cfg, fixture) = test_setup(&workspace);
    let transport = FixtureTransport::new(fixture);
    let verifier = CannedVerifier::new(VerificationOutcome::Success);

    let result =
        RepositoryTask::new(descriptor("widget", &cfg.branch), &cfg, &transport, &verifier)
            .run();

    assert!(matches!(result.commit, CommitOutcome::Committed { .. }));
    assert!(result.is_success());
    assert_eq!(transport.push_count(), 1);
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_verification_blocks_commit_and_persists_the_log() {
    let workspace = TempDir::new().unwrap();
    let (cfg, fixture) = test_setup(&workspace);
    let transport = FixtureTransport::new(fixture);
    let verifier = CannedVerifier::new(VerificationOutcome::Failure {
        log: "Could not resolve com.example:missing:9.9.9".to_string(),
    });

    let result =
        RepositoryTask::new(descriptor("widget", &cfg.branch), &cfg, &transport, &verifier)
            .run();

    let CommitOutcome::Aborted { stage, .. } = &result.commit else {
        panic!("expected abort, got {:?}", result.commit);
    };
    assert_eq!(stage, "verify");
    assert_eq!(transport.push_count(), 0);
    assert!(transport.commits.lock().unwrap().is_empty());

    let log_path = cfg.logs_dir.join("dependency-resolution-widget.log");
    let log = std::fs::read_to_string(log_path).unwrap();
    assert!(log.starts_with("***** widget DEPENDENCY RESOLUTION *****"));
    assert!(log.contains("com.example:missing:9.9.9"));
}

#[test]
fn verifier_tool_error_blocks_commit_without_a_failure_log() {
    let workspace = TempDir::new().unwrap();
    let (cfg, fixture) = test_setup(&workspace);
    let transport = FixtureTransport::new(fixture);
    let verifier = CannedVerifier::new(VerificationOutcome::ToolError {
        reason: "no wrapper executable".to_string(),
    });

    let result =
        RepositoryTask::new(descriptor("widget", &cfg.branch), &cfg, &transport, &verifier)
            .run();

    assert!(matches!(result.commit, CommitOutcome::Aborted { .. }));
    assert_eq!(transport.push_count(), 0);
    // A tool error is not a resolution failure; nothing for the ledger.
    assert!(!cfg.logs_dir.join("dependency-resolution-widget.log").exists());
}

#[test]
fn dry_run_never_reaches_the_verifier() {
    let workspace = TempDir::new().unwrap();
    let (mut cfg, fixture) = test_setup(&workspace);
    cfg.dry_run = true;
    let transport = FixtureTransport::new(fixture);
    let verifier = CannedVerifier::new(VerificationOutcome::Success);

    let result =
        RepositoryTask::new(descriptor("widget", &cfg.branch), &cfg, &transport, &verifier)
            .run();

    assert!(matches!(result.commit, CommitOutcome::Skipped { .. }));
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    assert_eq!(transport.push_count(), 0);
}

#[test]
fn clean_tree_after_verification_is_a_skip() {
    let workspace = TempDir::new().unwrap();
    let (cfg, fixture) = test_setup(&workspace);
    let mut transport = FixtureTransport::new(fixture);
    transport.clean_tree = true;
    let verifier = CannedVerifier::new(VerificationOutcome::Success);

    let result =
        RepositoryTask::new(descriptor("widget", &cfg.branch), &cfg, &transport, &verifier)
            .run();

    let CommitOutcome::Skipped { reason } = &result.commit else {
        panic!("expected skip, got {:?}", result.commit);
    };
    assert_eq!(reason, "no changes to commit");
    assert_eq!(transport.push_count(), 0);
}

#[test]
fn already_migrated_checkout_short_circuits_before_verification() {
    let workspace = TempDir::new().unwrap();
    let (cfg, fixture) = test_setup(&workspace);

    // Pre-migrate the fixture so the task finds nothing to change.
    let set = gradle_convoy::rules::sets::rule_set(
        gradle_convoy::types::Classification::Standard,
        &cfg,
    )
    .unwrap();
    gradle_convoy::rules::apply(&set, &fixture).unwrap();

    let transport = FixtureTransport::new(fixture);
    let verifier = CannedVerifier::new(VerificationOutcome::Success);
    let result =
        RepositoryTask::new(descriptor("widget", &cfg.branch), &cfg, &transport, &verifier)
            .run();

    let CommitOutcome::Skipped { reason } = &result.commit else {
        panic!("expected skip, got {:?}", result.commit);
    };
    assert_eq!(reason, "no changes needed");
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Batch fault isolation
// =============================================================================

#[tokio::test]
async fn a_panicking_worker_does_not_lose_the_batch() {
    let workspace = TempDir::new().unwrap();
    let (cfg, fixture) = test_setup(&workspace);
    let branch = cfg.branch.clone();

    let coordinator = Coordinator::new(
        cfg,
        Arc::new(FixtureTransport::new(fixture)),
        Arc::new(SelectivePanicVerifier {
            panic_on: "bravo".to_string(),
        }),
    );

    let report = coordinator
        .run(vec![
            descriptor("alpha", &branch),
            descriptor("bravo", &branch),
            descriptor("charlie", &branch),
        ])
        .await;

    // Every descriptor gets a terminal entry, panic or not.
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);

    let bravo = report
        .results
        .iter()
        .find(|r| r.url.contains("bravo"))
        .unwrap();
    assert!(!bravo.is_success());
    assert!(matches!(bravo.commit, CommitOutcome::Aborted { .. }));
}

#[tokio::test]
async fn batch_report_carries_one_entry_per_descriptor() {
    let workspace = TempDir::new().unwrap();
    let (cfg, fixture) = test_setup(&workspace);
    let branch = cfg.branch.clone();

    let coordinator = Coordinator::new(
        cfg,
        Arc::new(FixtureTransport::new(fixture)),
        Arc::new(CannedVerifier::new(VerificationOutcome::Success)),
    );

    let names = ["a", "b", "c", "d", "e"];
    let report = coordinator
        .run(names.iter().map(|n| descriptor(n, &branch)).collect())
        .await;

    assert_eq!(report.results.len(), names.len());
    assert_eq!(report.succeeded(), names.len());
    for name in names {
        assert!(report.results.iter().any(|r| r.url.contains(name)));
    }
}
