// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Error taxonomy for the migration pipeline
//!
//! Every error here is local to one repository task: it is captured into
//! that task's result and never propagates to sibling tasks or the
//! coordinator.

use thiserror::Error;

/// Failure of a version-control transport operation
#[derive(Debug, Error)]
pub enum TransportError {
    /// Clone failed
    #[error("clone of {url} failed: {reason}")]
    Clone {
        /// Repository URL
        url: String,
        /// Transport output
        reason: String,
    },

    /// Branch checkout/creation failed
    #[error("checkout of branch {branch} failed: {reason}")]
    Checkout {
        /// Branch name
        branch: String,
        /// Transport output
        reason: String,
    },

    /// Staging or committing the working tree failed
    #[error("commit failed: {reason}")]
    Commit {
        /// Transport output
        reason: String,
    },

    /// Push failed. The most severe case when verification already
    /// passed: local state is correct but unpublished.
    #[error("push of branch {branch} failed: {reason}")]
    Push {
        /// Branch name
        branch: String,
        /// Transport output
        reason: String,
    },

    /// The transport binary itself could not be invoked
    #[error("git could not be invoked: {0}")]
    Spawn(String),
}

/// Failure of one repository migration task
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The checkout matches no recognized layout, or the platform marker
    /// is present but malformed
    #[error("classification failed: {0}")]
    Classification(String),

    /// A mandatory rule target is absent from the checkout
    #[error("rule {rule}: required file missing: {file}")]
    MissingAnchor {
        /// Rule that required the file
        rule: String,
        /// Path relative to the checkout root
        file: String,
    },

    /// A rule target exists but not in the expected shape
    #[error("rule {rule}: anchor not found in {file}")]
    AnchorMismatch {
        /// Rule whose anchor failed to match
        rule: String,
        /// Path relative to the checkout root
        file: String,
    },

    /// Dependency resolution failed after the edits
    #[error("dependency resolution failed")]
    Verification,

    /// The resolution tool crashed or could not run; indeterminate,
    /// not a content problem
    #[error("resolution tool error: {0}")]
    Tool(String),

    /// A version-control operation failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}
