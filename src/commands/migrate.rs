// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Migrate command - runs the full batch pipeline over a fleet of repositories

use crate::config::MigrationConfig;
use crate::coordinator::Coordinator;
use crate::transport::SystemGit;
use crate::types::RepoDescriptor;
use crate::verify::GradleVerifier;
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Flags accepted by the migrate command
#[derive(Debug, Clone)]
pub struct MigrateArgs {
    /// Repository URLs given inline
    pub repos: Vec<String>,
    /// File with one repository URL per line
    pub file: Option<PathBuf>,
    /// Branch override
    pub branch: Option<String>,
    /// Commit message override
    pub commit_message: Option<String>,
    /// Backend base URL override
    pub backend_url: Option<String>,
    /// Concurrency override
    pub max_workers: Option<usize>,
    /// Workspace root override
    pub workspace: Option<PathBuf>,
    /// Classify and transform only, never verify or push
    pub dry_run: bool,
    /// Where the Markdown report is written
    pub report: Option<PathBuf>,
}

/// Run the migrate command
pub fn run(config_path: Option<&Path>, json: bool, args: MigrateArgs) -> Result<()> {
    let mut cfg = MigrationConfig::load(config_path)?;
    apply_overrides(&mut cfg, &args);

    let urls = collect_urls(&args.repos, args.file.as_deref())?;
    if urls.is_empty() {
        bail!("No repositories given; pass URLs or --file");
    }
    info!("Migrating {} repositories on branch {}", urls.len(), cfg.branch);

    let descriptors: Vec<RepoDescriptor> = urls
        .into_iter()
        .map(|url| RepoDescriptor::new(url, cfg.branch.clone()))
        .collect();

    let coordinator = Coordinator::new(
        cfg.clone(),
        Arc::new(SystemGit::default()),
        Arc::new(GradleVerifier),
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let report = runtime.block_on(coordinator.run(descriptors));

    let report_path = args
        .report
        .unwrap_or_else(|| PathBuf::from("migration-report.md"));
    std::fs::write(&report_path, report.to_markdown())
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let failed = report.failed();
        println!(
            "Migration finished: {} succeeded, {} failed",
            report.succeeded(),
            failed
        );
        for result in &report.results {
            let mark = if result.is_success() { "ok" } else { "FAIL" };
            let class = result
                .classification
                .map_or("unclassified", |c| c.label());
            println!("  [{mark}] {} ({class})", result.url);
        }
        println!("Report written to {}", report_path.display());
    }

    if report.failed() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Flags beat the config file, which beats the defaults
fn apply_overrides(cfg: &mut MigrationConfig, args: &MigrateArgs) {
    if let Some(branch) = &args.branch {
        cfg.branch = branch.clone();
    }
    if let Some(message) = &args.commit_message {
        cfg.commit_message = message.clone();
    }
    if let Some(backend_url) = &args.backend_url {
        cfg.backend_url = backend_url.trim_end_matches('/').to_string();
    }
    if let Some(workers) = args.max_workers {
        cfg.max_workers = workers;
    }
    if let Some(workspace) = &args.workspace {
        cfg.logs_dir = workspace.join("logs");
        cfg.workspace = workspace.clone();
    }
    cfg.dry_run = args.dry_run;
}

/// Merge inline URLs with the optional URL file, preserving order.
/// Blank lines and `#` comments in the file are ignored.
fn collect_urls(inline: &[String], file: Option<&Path>) -> Result<Vec<String>> {
    let mut urls: Vec<String> = inline.to_vec();
    if let Some(path) = file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            urls.push(line.to_string());
        }
    }
    // First occurrence wins on duplicates.
    let mut seen = std::collections::HashSet::new();
    urls.retain(|u| seen.insert(u.clone()));
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flags_override_config_values() {
        let mut cfg = MigrationConfig::default();
        let args = MigrateArgs {
            repos: vec![],
            file: None,
            branch: Some("feature/backend".to_string()),
            commit_message: None,
            backend_url: Some("https://repo.example/artifactory/".to_string()),
            max_workers: Some(3),
            workspace: Some(PathBuf::from("/tmp/convoy")),
            dry_run: true,
            report: None,
        };

        apply_overrides(&mut cfg, &args);
        assert_eq!(cfg.branch, "feature/backend");
        assert_eq!(cfg.backend_url, "https://repo.example/artifactory");
        assert_eq!(cfg.max_workers, 3);
        assert_eq!(cfg.workspace, PathBuf::from("/tmp/convoy"));
        assert_eq!(cfg.logs_dir, PathBuf::from("/tmp/convoy/logs"));
        assert!(cfg.dry_run);
    }

    #[test]
    fn url_file_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repos.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "# fleet").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "https://example.com/a.git").unwrap();
        writeln!(f, "  https://example.com/b.git  ").unwrap();
        drop(f);

        let urls = collect_urls(&[], Some(&path)).unwrap();
        assert_eq!(urls, vec![
            "https://example.com/a.git".to_string(),
            "https://example.com/b.git".to_string(),
        ]);
    }

    #[test]
    fn inline_urls_come_before_file_and_deduplicate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repos.txt");
        std::fs::write(&path, "https://example.com/a.git\n").unwrap();

        let urls = collect_urls(
            &["https://example.com/a.git".to_string()],
            Some(&path),
        )
        .unwrap();
        assert_eq!(urls.len(), 1);
    }
}
