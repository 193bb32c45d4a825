// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration for a migration batch

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Batch-level migration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Base URL of the target artifact backend
    pub backend_url: String,
    /// Branch created (or reused) for the migration commit
    pub branch: String,
    /// Default commit message
    pub commit_message: String,
    /// Maximum number of concurrent repository tasks
    pub max_workers: usize,
    /// Root directory for disposable checkouts and private caches
    pub workspace: PathBuf,
    /// Directory verification-failure logs are written to
    pub logs_dir: PathBuf,
    /// CI pipeline file names to replace, first match wins
    pub pipeline_files: Vec<String>,
    /// Glob for obsolete per-stage pipeline fragments to delete
    pub pipeline_fragment_glob: String,
    /// Version of the publishing plugin added to root build files
    pub publishing_plugin_version: String,
    /// Classify and transform only; never verify, commit, or push
    pub dry_run: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        let workspace = directories::ProjectDirs::from("com", "hyperpolymath", "gradle-convoy")
            .map(|d| d.cache_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join("gradle-convoy"));

        Self {
            backend_url: "https://artifactory.org.com/artifactory".to_string(),
            branch: "artifactory-migration".to_string(),
            commit_message: "Migrate from Nexus to Artifactory".to_string(),
            max_workers: 10,
            logs_dir: workspace.join("logs"),
            workspace,
            pipeline_files: vec!["Jenkinsfile".to_string()],
            pipeline_fragment_glob: "Jenkinsfile.*.groovy".to_string(),
            publishing_plugin_version: "4.28.2".to_string(),
            dry_run: false,
        }
    }
}

impl MigrationConfig {
    /// Load configuration from a TOML file, or defaults when no path is
    /// given
    ///
    /// # Errors
    ///
    /// The file cannot be read or is not valid TOML.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config {}", p.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config {}", p.display()))
            }
            None => Ok(Self::default()),
        }
    }
}
