// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Fixed text templates inserted or normalized by transformation rules

/// Path fragment under the backend where wrapper distributions live
pub const WRAPPER_DIST_PATH: &str = "libs-release/com/baml/plat/gradle/wrapper";

/// Marker token identifying the platform plugin group inside a version
/// catalog's `[versions]` section
pub const PLATFORM_MARKER: &str = "plasmaGradlePlugins";

/// Repository checkout path of the version catalog file
pub const CATALOG_FILE: &str = "gradle/libs.versions.toml";

/// Repositories block prepended to `settings.gradle`. Resolution
/// credentials are read from project properties with a system-property
/// fallback, matching the wrapper's own credential convention.
#[must_use]
pub fn settings_repositories_block(backend_url: &str) -> String {
    format!(
        r#"// Artifactory repositories for dependency resolution
repositories {{
    maven {{
        url = '{backend_url}/libs-release'
        credentials {{
            username = project.findProperty("artifactory_user") ?: System.getProperty("gradle.wrapperUser")
            password = project.findProperty("artifactory_password") ?: System.getProperty("gradle.wrapperPassword")
        }}
        authentication {{
            basic(BasicAuthentication)
        }}
    }}
    maven {{
        url = '{backend_url}/libs-snapshot'
        credentials {{
            username = project.findProperty("artifactory_user") ?: System.getProperty("gradle.wrapperUser")
            password = project.findProperty("artifactory_password") ?: System.getProperty("gradle.wrapperPassword")
        }}
        authentication {{
            basic(BasicAuthentication)
        }}
    }}
}}
"#
    )
}

/// Kotlin-DSL variant of the repositories block, for
/// `settings.gradle.kts` checkouts
#[must_use]
pub fn settings_repositories_block_kts(backend_url: &str) -> String {
    format!(
        r#"// Artifactory repositories for dependency resolution
repositories {{
    maven {{
        url = uri("{backend_url}/libs-release")
        credentials {{
            username = project.findProperty("artifactory_user") as String? ?: System.getProperty("gradle.wrapperUser")
            password = project.findProperty("artifactory_password") as String? ?: System.getProperty("gradle.wrapperPassword")
        }}
        authentication {{
            create<BasicAuthentication>("basic")
        }}
    }}
    maven {{
        url = uri("{backend_url}/libs-snapshot")
        credentials {{
            username = project.findProperty("artifactory_user") as String? ?: System.getProperty("gradle.wrapperUser")
            password = project.findProperty("artifactory_password") as String? ?: System.getProperty("gradle.wrapperPassword")
        }}
        authentication {{
            create<BasicAuthentication>("basic")
        }}
    }}
}}
"#
    )
}

/// Fixed minimal template the nested build-source settings file is
/// normalized to
#[must_use]
pub fn minimal_buildsrc_settings() -> String {
    "rootProject.name = 'buildSrc'\n".to_string()
}

/// Backend-specific CI pipeline template that replaces the primary
/// pipeline file
#[must_use]
pub fn pipeline_template(backend_url: &str) -> String {
    format!(
        r"pipeline {{
    agent any
    options {{
        timestamps()
        disableConcurrentBuilds()
    }}
    environment {{
        ARTIFACTORY_URL = '{backend_url}'
        ARTIFACTORY_CREDS = credentials('artifactory-publisher')
    }}
    stages {{
        stage('Build') {{
            steps {{
                sh './gradlew clean build --no-daemon'
            }}
        }}
        stage('Publish') {{
            when {{ branch 'main' }}
            steps {{
                sh './gradlew artifactoryPublish --no-daemon'
            }}
        }}
    }}
}}
"
    )
}
