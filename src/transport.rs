// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Version-control transport - clone, branch, commit, push
//!
//! The pipeline treats each operation as an atomic black box. The
//! production implementation shells out to `git`; tests substitute a
//! recording stub through the trait.

use crate::error::TransportError;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

/// Version-control capability consumed by repository tasks
pub trait Transport: Send + Sync {
    /// Clone `url` into `dest`
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), TransportError>;

    /// Check out `branch`, creating it first when `create` is set and it
    /// does not exist yet
    fn checkout_branch(
        &self,
        checkout: &Path,
        branch: &str,
        create: bool,
    ) -> Result<(), TransportError>;

    /// Stage and commit everything. Returns the commit SHA, or `None`
    /// when the working tree is clean.
    fn commit_all(&self, checkout: &Path, message: &str)
        -> Result<Option<String>, TransportError>;

    /// Push `branch` to the origin remote
    fn push(&self, checkout: &Path, branch: &str) -> Result<(), TransportError>;
}

/// `git` subprocess transport
#[derive(Debug, Clone)]
pub struct SystemGit {
    /// Committer name
    pub user: String,
    /// Committer email
    pub email: String,
}

impl Default for SystemGit {
    fn default() -> Self {
        Self {
            user: std::env::var("GIT_USER").unwrap_or_else(|_| "Migration Bot".to_string()),
            email: std::env::var("GIT_EMAIL")
                .unwrap_or_else(|_| "migration@bot.com".to_string()),
        }
    }
}

impl SystemGit {
    fn run(args: &[&str], cwd: Option<&Path>) -> Result<(bool, String), TransportError> {
        let mut command = Command::new("git");
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        let output = command
            .output()
            .map_err(|e| TransportError::Spawn(e.to_string()))?;
        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            text.push_str(&String::from_utf8_lossy(&output.stderr));
        }
        Ok((output.status.success(), text.trim().to_string()))
    }
}

/// Convert well-known HTTPS remotes to SSH form, assuming key auth
#[must_use]
pub fn prefer_ssh(url: &str) -> String {
    if url.starts_with("git@") || url.starts_with("ssh://") {
        return url.to_string();
    }
    if let Some(rest) = url.strip_prefix("https://github.com/") {
        return format!("git@github.com:{}", ensure_git_suffix(rest));
    }
    if let Some(rest) = url.strip_prefix("https://gitlab.com/") {
        return format!("git@gitlab.com:{}", ensure_git_suffix(rest));
    }
    url.to_string()
}

fn ensure_git_suffix(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.ends_with(".git") {
        trimmed.to_string()
    } else {
        format!("{trimmed}.git")
    }
}

impl Transport for SystemGit {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), TransportError> {
        let ssh_url = prefer_ssh(url);
        info!("Cloning {ssh_url}");
        let (ok, out) = Self::run(&["clone", &ssh_url, &dest.to_string_lossy()], None)?;
        if ok {
            Ok(())
        } else {
            Err(TransportError::Clone {
                url: url.to_string(),
                reason: out,
            })
        }
    }

    fn checkout_branch(
        &self,
        checkout: &Path,
        branch: &str,
        create: bool,
    ) -> Result<(), TransportError> {
        if create {
            let (created, _) = Self::run(&["checkout", "-b", branch], Some(checkout))?;
            if created {
                debug!("Created branch {branch}");
                return Ok(());
            }
        }
        // Branch may already exist from an earlier partial run.
        let (ok, out) = Self::run(&["checkout", branch], Some(checkout))?;
        if ok {
            Ok(())
        } else {
            Err(TransportError::Checkout {
                branch: branch.to_string(),
                reason: out,
            })
        }
    }

    fn commit_all(
        &self,
        checkout: &Path,
        message: &str,
    ) -> Result<Option<String>, TransportError> {
        let steps: &[&[&str]] = &[
            &["config", "user.name", &self.user],
            &["config", "user.email", &self.email],
            &["add", "."],
        ];
        for args in steps {
            let (ok, out) = Self::run(args, Some(checkout))?;
            if !ok {
                return Err(TransportError::Commit { reason: out });
            }
        }

        let (_, status) = Self::run(&["status", "--porcelain"], Some(checkout))?;
        if status.is_empty() {
            return Ok(None);
        }

        let (ok, out) = Self::run(&["commit", "-m", message], Some(checkout))?;
        if !ok {
            return Err(TransportError::Commit { reason: out });
        }

        let (ok, sha) = Self::run(&["rev-parse", "HEAD"], Some(checkout))?;
        if ok {
            Ok(Some(sha))
        } else {
            Err(TransportError::Commit { reason: sha })
        }
    }

    fn push(&self, checkout: &Path, branch: &str) -> Result<(), TransportError> {
        info!("Pushing branch {branch}");
        let (ok, out) = Self::run(&["push", "-u", "origin", branch], Some(checkout))?;
        if ok {
            Ok(())
        } else {
            Err(TransportError::Push {
                branch: branch.to_string(),
                reason: out,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_github_urls_become_ssh() {
        assert_eq!(
            prefer_ssh("https://github.com/org/widget"),
            "git@github.com:org/widget.git"
        );
        assert_eq!(
            prefer_ssh("https://github.com/org/widget.git"),
            "git@github.com:org/widget.git"
        );
    }

    #[test]
    fn ssh_urls_pass_through() {
        assert_eq!(
            prefer_ssh("git@github.com:org/widget.git"),
            "git@github.com:org/widget.git"
        );
    }
}
