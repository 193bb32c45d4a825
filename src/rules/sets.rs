// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Per-classification rule sets
//!
//! Content differs per migration path; the mechanism is always the
//! engine in the parent module. Order matters and is fixed here.

use super::{EditOp, Pred, Rule, RuleSet, Target};
use crate::config::MigrationConfig;
use crate::templates;
use crate::types::Classification;
use anyhow::{Context, Result};
use regex::Regex;

/// Build the ordered rule set for a classification.
///
/// # Errors
///
/// Fails only when a removal pattern does not compile.
pub fn rule_set(classification: Classification, cfg: &MigrationConfig) -> Result<RuleSet> {
    let rules = match classification {
        Classification::Standard => standard_rules(cfg)?,
        Classification::GradlePlatform => platform_rules(cfg)?,
        Classification::VersionCatalog => catalog_rules(cfg),
    };
    Ok(RuleSet {
        classification,
        rules,
    })
}

fn backend_host(cfg: &MigrationConfig) -> String {
    cfg.backend_url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split('/')
        .next()
        .unwrap_or(&cfg.backend_url)
        .to_string()
}

fn standard_rules(cfg: &MigrationConfig) -> Result<Vec<Rule>> {
    let mut rules = vec![
        Rule {
            id: "settings-repositories".to_string(),
            target: Target::FirstOf(vec![
                "settings.gradle".to_string(),
                "settings.gradle.kts".to_string(),
            ]),
            mandatory: true,
            applied_when: Some(Pred::Contains(backend_host(cfg))),
            op: EditOp::InsertTop {
                text: templates::settings_repositories_block(&cfg.backend_url),
                kts_text: Some(templates::settings_repositories_block_kts(&cfg.backend_url)),
            },
        },
        wrapper_rule(cfg),
        Rule {
            id: "root-build-remove-legacy".to_string(),
            target: Target::FirstOf(vec![
                "build.gradle".to_string(),
                "build.gradle.kts".to_string(),
            ]),
            mandatory: true,
            applied_when: None,
            op: EditOp::RemoveBlocks {
                patterns: legacy_backend_patterns()?,
            },
        },
        Rule {
            id: "root-build-add-publishing-plugin".to_string(),
            target: Target::FirstOf(vec![
                "build.gradle".to_string(),
                "build.gradle.kts".to_string(),
            ]),
            mandatory: true,
            applied_when: Some(Pred::Contains("com.jfrog.artifactory".to_string())),
            op: EditOp::AddPlugin {
                line: format!(
                    "id 'com.jfrog.artifactory' version '{}'",
                    cfg.publishing_plugin_version
                ),
                kts_line: format!(
                    "id(\"com.jfrog.artifactory\") version \"{}\"",
                    cfg.publishing_plugin_version
                ),
            },
        },
        Rule {
            id: "submodule-build-remove-legacy".to_string(),
            target: Target::NestedBuildFiles,
            mandatory: false,
            applied_when: None,
            op: EditOp::RemoveBlocks {
                patterns: legacy_backend_patterns()?,
            },
        },
    ];
    rules.extend(pipeline_rules(cfg));
    Ok(rules)
}

fn platform_rules(cfg: &MigrationConfig) -> Result<Vec<Rule>> {
    let mut rules = vec![
        wrapper_rule(cfg),
        Rule {
            id: "catalog-plugin-coordinates".to_string(),
            target: Target::Fixed(templates::CATALOG_FILE.to_string()),
            mandatory: true,
            applied_when: None,
            op: EditOp::ReplaceTokens {
                pairs: vec![
                    (
                        "ops.plasma.publishing-nexus".to_string(),
                        "ops.plasma.publishing-artifactory".to_string(),
                    ),
                    (
                        "ops.plasma.repositories-nexus".to_string(),
                        "ops.plasma.repositories-artifactory".to_string(),
                    ),
                    (
                        "plugin-publishing-nexus".to_string(),
                        "plugin-publishing-artifactory".to_string(),
                    ),
                    (
                        "plugin-repositories-nexus".to_string(),
                        "plugin-repositories-artifactory".to_string(),
                    ),
                ],
            },
        },
        Rule {
            id: "buildsrc-plugin-references".to_string(),
            target: Target::Fixed("buildSrc/build.gradle".to_string()),
            mandatory: false,
            applied_when: None,
            op: EditOp::ReplaceTokens {
                pairs: vec![
                    (
                        "libs.plugin.publishing-nexus".to_string(),
                        "libs.plugin.publishing-artifactory".to_string(),
                    ),
                    (
                        "libs.plugin.repositories-nexus".to_string(),
                        "libs.plugin.repositories-artifactory".to_string(),
                    ),
                ],
            },
        },
        buildsrc_settings_rule(),
        Rule {
            id: "root-settings-strip-delegation".to_string(),
            target: Target::FirstOf(vec![
                "settings.gradle".to_string(),
                "settings.gradle.kts".to_string(),
            ]),
            mandatory: true,
            applied_when: None,
            op: EditOp::RemoveBlocks {
                patterns: delegation_patterns()?,
            },
        },
    ];
    rules.extend(pipeline_rules(cfg));
    Ok(rules)
}

fn catalog_rules(cfg: &MigrationConfig) -> Vec<Rule> {
    let mut rules = vec![wrapper_rule(cfg), buildsrc_settings_rule()];
    rules.extend(pipeline_rules(cfg));
    rules
}

/// Shared wrapper rewrite rule; its idempotence check lives inside the
/// rewrite op since the properties file may escape colons
fn wrapper_rule(cfg: &MigrationConfig) -> Rule {
    Rule {
        id: "wrapper-distribution-url".to_string(),
        target: Target::WrapperProperties,
        mandatory: true,
        applied_when: None,
        op: EditOp::RewriteDistributionUrl {
            base_url: cfg.backend_url.clone(),
        },
    }
}

fn buildsrc_settings_rule() -> Rule {
    Rule {
        id: "buildsrc-settings-normalize".to_string(),
        target: Target::Fixed("buildSrc/settings.gradle".to_string()),
        mandatory: false,
        applied_when: None,
        op: EditOp::NormalizeTo {
            contents: templates::minimal_buildsrc_settings(),
        },
    }
}

/// Every path concludes by replacing the CI pipeline file and deleting
/// the obsolete per-stage fragments
fn pipeline_rules(cfg: &MigrationConfig) -> Vec<Rule> {
    vec![
        Rule {
            id: "ci-pipeline-replace".to_string(),
            target: Target::FirstOf(cfg.pipeline_files.clone()),
            mandatory: false,
            applied_when: None,
            op: EditOp::ReplaceWithBackup {
                contents: templates::pipeline_template(&cfg.backend_url),
                backup_name: "Jenkinsfile.backup".to_string(),
            },
        },
        Rule {
            id: "ci-fragments-delete".to_string(),
            target: Target::FragmentGlob(cfg.pipeline_fragment_glob.clone()),
            mandatory: false,
            applied_when: None,
            op: EditOp::DeleteMatching,
        },
    ]
}

/// Removal patterns for everything tied to the old backend in the root
/// build file: classpath declarations, credential wiring, plugin
/// applications, configuration blocks, and wrapper URL overrides
fn legacy_backend_patterns() -> Result<Vec<Regex>> {
    compile(&[
        r#"(?i)classpath\s+["']com\.bmuschko:gradle-nexus-plugin[^"']*["']"#,
        r"(?i)def\s+nexusCredentialsLocation\s*=[^\n]*",
        r"(?is)ext\s*\{[^}]*?(?:branchName|repoName|uploadArchivesUrl|nexusCredentials|nexusUsername|nexusPassword)[^}]*?\}",
        r"(?is)if\s*\(\s*ext\.nexusCredentials\.exists\(\)\s*\)\s*\{[^}]*\}",
        r"(?i)uploadArchives\.enabled\s*=\s*(?:true|false)",
        r#"(?i)apply\s+plugin\s*:\s*["']com\.bmuschko\.nexus["']"#,
        r"(?is)nexus\s*\{[^}]*?(?:sign|repositoryUrl)[^}]*?\}",
        r"(?is)wrapper\s*\{[^}]*?(?:gradleVersion|distributionUrl)[^}]*?\}",
    ])
}

/// Delegation blocks stripped from the root settings file under the
/// platform model (the platform supplies repositories itself).
/// Brace nesting to three levels, enough for the usual
/// `repositories { maven { url } }` shape inside the block.
fn delegation_patterns() -> Result<Vec<Regex>> {
    const BODY: &str = r"\{(?:[^{}]|\{(?:[^{}]|\{[^{}]*\})*\})*\}";
    let plugin = format!(r"(?s)pluginManagement\s*{BODY}");
    let resolution = format!(r"(?s)dependencyResolutionManagement\s*{BODY}");
    compile(&[plugin.as_str(), resolution.as_str()])
}

fn compile(patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("invalid pattern: {p}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_rule_sets_build() {
        let cfg = MigrationConfig::default();
        for class in [
            Classification::Standard,
            Classification::GradlePlatform,
            Classification::VersionCatalog,
        ] {
            let set = rule_set(class, &cfg).unwrap();
            assert_eq!(set.classification, class);
            assert!(!set.rules.is_empty());
        }
    }

    #[test]
    fn catalog_path_never_touches_plugin_coordinates() {
        let cfg = MigrationConfig::default();
        let set = rule_set(Classification::VersionCatalog, &cfg).unwrap();
        assert!(set
            .rules
            .iter()
            .all(|r| r.id != "catalog-plugin-coordinates"));
    }

    #[test]
    fn standard_path_cleans_submodules_after_the_root_build() {
        let cfg = MigrationConfig::default();
        let set = rule_set(Classification::Standard, &cfg).unwrap();
        let ids: Vec<&str> = set.rules.iter().map(|r| r.id.as_str()).collect();
        let root = ids
            .iter()
            .position(|id| *id == "root-build-remove-legacy")
            .unwrap();
        let sub = ids
            .iter()
            .position(|id| *id == "submodule-build-remove-legacy")
            .unwrap();
        assert!(root < sub);
    }

    #[test]
    fn delegation_patterns_cover_nested_repository_blocks() {
        let patterns = delegation_patterns().unwrap();
        let settings = "pluginManagement {\n    repositories {\n        maven { url 'https://nexus.example' }\n    }\n}\nrootProject.name = 'x'\n";
        let matched = patterns[0].find(settings).unwrap();
        assert!(matched.as_str().ends_with('}'));
        assert!(!settings[matched.end()..].contains("maven"));
    }

    #[test]
    fn every_path_ends_with_pipeline_rules() {
        let cfg = MigrationConfig::default();
        for class in [
            Classification::Standard,
            Classification::GradlePlatform,
            Classification::VersionCatalog,
        ] {
            let set = rule_set(class, &cfg).unwrap();
            let ids: Vec<&str> = set.rules.iter().map(|r| r.id.as_str()).collect();
            let n = ids.len();
            assert_eq!(ids[n - 2], "ci-pipeline-replace");
            assert_eq!(ids[n - 1], "ci-fragments-delete");
        }
    }
}
