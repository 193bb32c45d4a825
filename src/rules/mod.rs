// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Transformation engine - ordered, idempotent, anchor-based edits
//!
//! Rules are immutable data: a target, an idempotence precondition, and
//! an edit operation. The engine applies a rule set in the caller's
//! order and never reorders; later rules may depend on artifacts created
//! by earlier ones. Re-applying a rule set to an already-migrated tree
//! is a sequence of recorded no-ops.

pub mod sets;

use crate::error::MigrationError;
use crate::types::Classification;
use globset::Glob;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where a rule's edit applies
#[derive(Debug, Clone)]
pub enum Target {
    /// A fixed path relative to the checkout root
    Fixed(String),
    /// The first existing name from a list; falls back to the first name
    /// for operations that may create the file
    FirstOf(Vec<String>),
    /// The wrapper properties file, discovered anywhere in the tree
    WrapperProperties,
    /// Top-level files matching a glob (deletion targets)
    FragmentGlob(String),
    /// Every nested `build.gradle`/`build.gradle.kts` below the checkout
    /// root, excluding the root build file and `buildSrc`
    NestedBuildFiles,
}

/// Idempotence precondition: when it holds the rule is recorded as a
/// no-op and never re-applied
#[derive(Debug, Clone)]
pub enum Pred {
    /// The file content contains the given substring
    Contains(String),
}

impl Pred {
    fn holds(&self, content: &str) -> bool {
        match self {
            Self::Contains(token) => content.contains(token),
        }
    }
}

/// The edit a rule performs on its target
#[derive(Debug, Clone)]
pub enum EditOp {
    /// Insert a block above the current first line
    InsertTop {
        /// Block text, newline-terminated
        text: String,
        /// Variant used when the target is a `.kts` file; falls back to
        /// `text` when absent
        kts_text: Option<String>,
    },
    /// Add a plugin declaration inside the `plugins {}` block, appending
    /// a new block when none exists
    AddPlugin {
        /// Full plugin line, e.g. `id 'com.jfrog.artifactory' version '4.28.2'`
        line: String,
        /// Kotlin-DSL spelling of the same declaration
        kts_line: String,
    },
    /// Remove every match of the given block patterns, then collapse the
    /// doubled blank lines left behind
    RemoveBlocks {
        /// Compiled removal patterns
        patterns: Vec<Regex>,
    },
    /// Replace literal tokens, each only when present; never inserts
    ReplaceTokens {
        /// Ordered (old, new) pairs
        pairs: Vec<(String, String)>,
    },
    /// Rewrite the wrapper `distributionUrl` to the new backend, deriving
    /// the version fragment from the old URL
    RewriteDistributionUrl {
        /// Backend base URL
        base_url: String,
    },
    /// Overwrite the file with a fixed template
    NormalizeTo {
        /// Template content
        contents: String,
    },
    /// Replace the file with a template after backing up the original;
    /// creates the file when absent
    ReplaceWithBackup {
        /// Template content
        contents: String,
        /// Backup file name, relative to the target's directory
        backup_name: String,
    },
    /// Delete every file the target glob matches
    DeleteMatching,
}

/// One declarative edit unit
#[derive(Debug, Clone)]
pub struct Rule {
    /// Stable identifier recorded in task results
    pub id: String,
    /// Where the edit applies
    pub target: Target,
    /// Whether an absent target aborts the whole path
    pub mandatory: bool,
    /// Skip-if-already-applied precondition
    pub applied_when: Option<Pred>,
    /// The edit itself
    pub op: EditOp,
}

/// Ordered rules for one classification
#[derive(Debug, Clone)]
pub struct RuleSet {
    /// The migration path these rules implement
    pub classification: Classification,
    /// Rules in application order
    pub rules: Vec<Rule>,
}

/// Result of applying a rule set
#[derive(Debug, Clone, Default)]
pub struct Applied {
    /// Changed files, relative to the checkout root
    pub files_changed: Vec<String>,
    /// Rule ids that performed an edit
    pub applied: Vec<String>,
    /// Rule ids recorded as no-ops
    pub skipped: Vec<String>,
}

/// Apply a rule set to a checkout.
///
/// Rules run in order. A mandatory target that is absent, or an anchor
/// that does not match, aborts the whole path before verification is
/// attempted; edits already staged die with the checkout.
///
/// # Errors
///
/// `MigrationError::MissingAnchor` or `MigrationError::AnchorMismatch`.
pub fn apply(set: &RuleSet, checkout: &Path) -> Result<Applied, MigrationError> {
    let mut outcome = Applied::default();

    for rule in &set.rules {
        match &rule.op {
            EditOp::DeleteMatching => {
                apply_delete(rule, checkout, &mut outcome)?;
            }
            EditOp::ReplaceWithBackup { contents, backup_name } => {
                apply_replace_with_backup(
                    rule,
                    checkout,
                    contents,
                    backup_name,
                    &mut outcome,
                )?;
            }
            _ if matches!(rule.target, Target::NestedBuildFiles) => {
                apply_nested_edit(rule, checkout, &mut outcome)?;
            }
            _ => {
                apply_file_edit(rule, checkout, &mut outcome)?;
            }
        }
    }

    Ok(outcome)
}

/// Resolve a single-file target to an existing path
fn resolve_file(rule: &Rule, checkout: &Path) -> Result<Option<PathBuf>, MigrationError> {
    let found = match &rule.target {
        Target::Fixed(rel) => {
            let path = checkout.join(rel);
            path.exists().then_some(path)
        }
        Target::FirstOf(names) => names
            .iter()
            .map(|n| checkout.join(n))
            .find(|p| p.exists()),
        Target::WrapperProperties => find_wrapper_properties(checkout),
        Target::FragmentGlob(_) | Target::NestedBuildFiles => None,
    };

    if found.is_none() && rule.mandatory {
        return Err(MigrationError::MissingAnchor {
            rule: rule.id.clone(),
            file: target_label(&rule.target),
        });
    }
    Ok(found)
}

fn target_label(target: &Target) -> String {
    match target {
        Target::Fixed(rel) => rel.clone(),
        Target::FirstOf(names) => names.join("|"),
        Target::WrapperProperties => "gradle/wrapper/gradle-wrapper.properties".to_string(),
        Target::FragmentGlob(glob) => glob.clone(),
        Target::NestedBuildFiles => "**/build.gradle".to_string(),
    }
}

/// Locate the wrapper properties file anywhere under the checkout,
/// shallowest match first
fn find_wrapper_properties(checkout: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = WalkDir::new(checkout)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| {
            e.file_type().is_file()
                && e.file_name() == "gradle-wrapper.properties"
                && e.path()
                    .parent()
                    .is_some_and(|p| p.ends_with("gradle/wrapper"))
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    candidates.sort_by_key(|p| p.components().count());
    candidates.into_iter().next()
}

fn relative_label(checkout: &Path, path: &Path) -> String {
    path.strip_prefix(checkout)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

fn read(path: &Path, rule: &Rule) -> Result<String, MigrationError> {
    std::fs::read_to_string(path).map_err(|_| MigrationError::AnchorMismatch {
        rule: rule.id.clone(),
        file: path.to_string_lossy().to_string(),
    })
}

fn write(path: &Path, content: &str, rule: &Rule) -> Result<(), MigrationError> {
    std::fs::write(path, content).map_err(|_| MigrationError::AnchorMismatch {
        rule: rule.id.clone(),
        file: path.to_string_lossy().to_string(),
    })
}

fn apply_file_edit(
    rule: &Rule,
    checkout: &Path,
    outcome: &mut Applied,
) -> Result<(), MigrationError> {
    let Some(path) = resolve_file(rule, checkout)? else {
        outcome.skipped.push(rule.id.clone());
        return Ok(());
    };

    let content = read(&path, rule)?;

    if rule.applied_when.as_ref().is_some_and(|p| p.holds(&content)) {
        outcome.skipped.push(rule.id.clone());
        return Ok(());
    }

    match edited_content(rule, checkout, &path, &content)? {
        Some(new_content) => {
            write(&path, &new_content, rule)?;
            outcome.files_changed.push(relative_label(checkout, &path));
            outcome.applied.push(rule.id.clone());
        }
        None => outcome.skipped.push(rule.id.clone()),
    }
    Ok(())
}

/// Compute the edited content for a single-file operation, `None` when
/// the edit is a no-op. Groovy/Kotlin variants are chosen by the target
/// file's extension.
fn edited_content(
    rule: &Rule,
    checkout: &Path,
    path: &Path,
    content: &str,
) -> Result<Option<String>, MigrationError> {
    let edited = match &rule.op {
        EditOp::InsertTop { text, kts_text } => {
            let block = if is_kotlin_dsl(path) {
                kts_text.as_deref().unwrap_or(text)
            } else {
                text
            };
            Some(format!("{block}\n{content}"))
        }
        EditOp::AddPlugin { line, kts_line } => {
            let line = if is_kotlin_dsl(path) { kts_line } else { line };
            Some(add_plugin(content, line))
        }
        EditOp::RemoveBlocks { patterns } => remove_blocks(content, patterns),
        EditOp::ReplaceTokens { pairs } => replace_tokens(content, pairs),
        EditOp::RewriteDistributionUrl { base_url } => {
            match rewrite_distribution_url(content, base_url) {
                DistributionRewrite::Rewritten(new) => Some(new),
                DistributionRewrite::AlreadyMigrated => None,
                DistributionRewrite::NoAnchor => {
                    return Err(MigrationError::AnchorMismatch {
                        rule: rule.id.clone(),
                        file: relative_label(checkout, path),
                    });
                }
            }
        }
        EditOp::NormalizeTo { contents } => {
            (content != contents.as_str()).then(|| contents.clone())
        }
        // Handled by the dedicated apply_* paths
        EditOp::ReplaceWithBackup { .. } | EditOp::DeleteMatching => None,
    };
    Ok(edited)
}

fn is_kotlin_dsl(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "kts")
}

/// Apply one rule across every nested build file. The rule counts as
/// applied when at least one file changed; precondition and no-op
/// checks run per file.
fn apply_nested_edit(
    rule: &Rule,
    checkout: &Path,
    outcome: &mut Applied,
) -> Result<(), MigrationError> {
    let mut changed = false;

    for path in find_nested_build_files(checkout) {
        let content = read(&path, rule)?;
        if rule.applied_when.as_ref().is_some_and(|p| p.holds(&content)) {
            continue;
        }
        if let Some(new_content) = edited_content(rule, checkout, &path, &content)? {
            write(&path, &new_content, rule)?;
            outcome.files_changed.push(relative_label(checkout, &path));
            changed = true;
        }
    }

    if changed {
        outcome.applied.push(rule.id.clone());
    } else {
        outcome.skipped.push(rule.id.clone());
    }
    Ok(())
}

/// Submodule build files below the checkout root, in a stable order.
/// The root build file has its own rules and `buildSrc` is handled by
/// the build-source rules, so both are excluded here.
fn find_nested_build_files(checkout: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(checkout)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || (e.file_name() != "buildSrc" && e.file_name() != ".git")
        })
        .filter_map(Result::ok)
        .filter(|e| {
            e.depth() >= 2
                && e.file_type().is_file()
                && (e.file_name() == "build.gradle" || e.file_name() == "build.gradle.kts")
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

fn apply_replace_with_backup(
    rule: &Rule,
    checkout: &Path,
    contents: &str,
    backup_name: &str,
    outcome: &mut Applied,
) -> Result<(), MigrationError> {
    // The pipeline file is created when absent, so a missing target is
    // not an anchor failure here.
    let path = match resolve_file(rule, checkout) {
        Ok(Some(p)) => p,
        _ => match &rule.target {
            Target::FirstOf(names) if !names.is_empty() => checkout.join(&names[0]),
            Target::Fixed(rel) => checkout.join(rel),
            _ => {
                outcome.skipped.push(rule.id.clone());
                return Ok(());
            }
        },
    };

    if path.exists() {
        let existing = read(&path, rule)?;
        if existing == contents {
            outcome.skipped.push(rule.id.clone());
            return Ok(());
        }
        let backup = path.with_file_name(backup_name);
        std::fs::copy(&path, &backup).map_err(|_| MigrationError::AnchorMismatch {
            rule: rule.id.clone(),
            file: relative_label(checkout, &backup),
        })?;
        outcome.files_changed.push(relative_label(checkout, &backup));
    }

    write(&path, contents, rule)?;
    outcome.files_changed.push(relative_label(checkout, &path));
    outcome.applied.push(rule.id.clone());
    Ok(())
}

fn apply_delete(
    rule: &Rule,
    checkout: &Path,
    outcome: &mut Applied,
) -> Result<(), MigrationError> {
    let Target::FragmentGlob(pattern) = &rule.target else {
        outcome.skipped.push(rule.id.clone());
        return Ok(());
    };

    let matcher = Glob::new(pattern)
        .map_err(|e| MigrationError::AnchorMismatch {
            rule: rule.id.clone(),
            file: e.to_string(),
        })?
        .compile_matcher();

    let mut deleted = false;
    if let Ok(entries) = std::fs::read_dir(checkout) {
        for entry in entries.filter_map(Result::ok) {
            let name = entry.file_name();
            if entry.path().is_file() && matcher.is_match(Path::new(&name)) {
                if std::fs::remove_file(entry.path()).is_ok() {
                    outcome
                        .files_changed
                        .push(relative_label(checkout, &entry.path()));
                    deleted = true;
                }
            }
        }
    }

    if deleted {
        outcome.applied.push(rule.id.clone());
    } else {
        outcome.skipped.push(rule.id.clone());
    }
    Ok(())
}

/// Insert a plugin line into the `plugins {}` block, or append a new
/// block when none exists
fn add_plugin(content: &str, line: &str) -> String {
    // One-level block is enough for plugins declarations.
    let re = Regex::new(r"(?s)plugins\s*\{[^}]*\}").expect("static pattern");
    if let Some(m) = re.find(content) {
        let block = m.as_str();
        let trimmed = block.trim_end();
        if let Some(body) = trimmed.strip_suffix('}') {
            let new_block = format!("{}\n    {line}\n}}", body.trim_end());
            return content.replacen(block, &new_block, 1);
        }
    }
    format!("{}\n\nplugins {{\n    {line}\n}}\n", content.trim_end())
}

/// Remove matched blocks, returning `None` when nothing matched
fn remove_blocks(content: &str, patterns: &[Regex]) -> Option<String> {
    let mut current = content.to_string();
    let mut removed = false;

    for pattern in patterns {
        if pattern.is_match(&current) {
            current = pattern.replace_all(&current, "").to_string();
            removed = true;
        }
    }

    if !removed {
        return None;
    }

    // Collapse runs of blank lines left by the removals.
    let collapse = Regex::new(r"\n{3,}").expect("static pattern");
    let mut cleaned = collapse.replace_all(&current, "\n\n").to_string();
    while cleaned.ends_with("\n\n") {
        cleaned.pop();
    }
    if !cleaned.ends_with('\n') {
        cleaned.push('\n');
    }
    Some(cleaned)
}

/// Replace each literal token only when present
fn replace_tokens(content: &str, pairs: &[(String, String)]) -> Option<String> {
    let mut current = content.to_string();
    let mut changed = false;
    for (old, new) in pairs {
        if current.contains(old.as_str()) {
            current = current.replace(old.as_str(), new);
            changed = true;
        }
    }
    changed.then_some(current)
}

/// Oldest wrapper distribution the fleet is allowed to stay on
const MINIMUM_WRAPPER_VERSION: &str = "6.9.2";

/// Network timeout enforced on wrapper downloads, in milliseconds
const WRAPPER_NETWORK_TIMEOUT: u64 = 600_000;

enum DistributionRewrite {
    Rewritten(String),
    AlreadyMigrated,
    NoAnchor,
}

/// Rewrite `distributionUrl` to the backend, preserving the embedded
/// version and distribution type and flooring the version at
/// `MINIMUM_WRAPPER_VERSION`. Also enforces a generous `networkTimeout`.
fn rewrite_distribution_url(content: &str, base_url: &str) -> DistributionRewrite {
    let line_re = Regex::new(r"(?m)^(\s*distributionUrl\s*=\s*)(.+)$").expect("static pattern");
    let Some(caps) = line_re.captures(content) else {
        return DistributionRewrite::NoAnchor;
    };
    let prefix = caps.get(1).map_or("", |m| m.as_str()).to_string();
    let old_url_raw = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
    let escaped = old_url_raw.contains("\\:");
    let old_url = old_url_raw.replace("\\:", ":");

    if old_url.starts_with(base_url) {
        return DistributionRewrite::AlreadyMigrated;
    }

    let version_re = Regex::new(r"gradle-([0-9.]+)-(bin|all)\.zip").expect("static pattern");
    let Some(vcaps) = version_re.captures(&old_url) else {
        return DistributionRewrite::NoAnchor;
    };
    let mut version = vcaps.get(1).map_or("", |m| m.as_str()).to_string();
    let mut dist_type = vcaps.get(2).map_or("bin", |m| m.as_str()).to_string();

    if version_below(&version, MINIMUM_WRAPPER_VERSION) {
        version = MINIMUM_WRAPPER_VERSION.to_string();
        dist_type = "all".to_string();
    }

    let new_url = format!(
        "{base_url}/{}/gradle-{version}-{dist_type}.zip",
        crate::templates::WRAPPER_DIST_PATH
    );
    let new_url_prop = if escaped {
        new_url.replace(':', "\\:")
    } else {
        new_url
    };

    let m = caps.get(0).expect("whole match");
    let mut new_content = format!(
        "{}{prefix}{new_url_prop}{}",
        &content[..m.start()],
        &content[m.end()..]
    );

    new_content = ensure_network_timeout(&new_content);
    DistributionRewrite::Rewritten(new_content)
}

/// Add or raise `networkTimeout` so wrapper downloads from the backend
/// do not flake
fn ensure_network_timeout(content: &str) -> String {
    let nt_re = Regex::new(r"(?m)^(\s*networkTimeout\s*=\s*)(\d+)\s*$").expect("static pattern");
    if let Some(caps) = nt_re.captures(content) {
        let current: u64 = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        if current >= WRAPPER_NETWORK_TIMEOUT {
            return content.to_string();
        }
        let m = caps.get(0).expect("whole match");
        let prefix = caps.get(1).map_or("", |c| c.as_str());
        return format!(
            "{}{prefix}{WRAPPER_NETWORK_TIMEOUT}{}",
            &content[..m.start()],
            &content[m.end()..]
        );
    }
    let mut out = content.to_string();
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&format!("networkTimeout={WRAPPER_NETWORK_TIMEOUT}\n"));
    out
}

/// Compare dotted numeric versions
fn version_below(version: &str, floor: &str) -> bool {
    let parse = |v: &str| -> Vec<u32> {
        v.split('.').filter_map(|p| p.parse().ok()).collect()
    };
    parse(version) < parse(floor)
}
