//! Error types for Tandem operations.
//!
//! This module provides the main error type [`TandemError`]. Errors fall into
//! two groups: rejections caused by the request itself (the documents are left
//! exactly as they were) and internal failures that point at a bug or a broken
//! collaborator. [`TandemError::is_rejection`] tells them apart.

use std::io;

use thiserror::Error;

use tandem_core::{error::ModelError, identifier::Id, semantic::ElementKind};

/// The main error type for Tandem operations.
#[derive(Debug, Error)]
pub enum TandemError {
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A compound command step could not run because an earlier step did not
    /// produce what it depends on. The whole command was rolled back.
    #[error("command `{command}` aborted: {reason}")]
    PartialApplication { command: String, reason: String },

    /// No derivation rule matched a node that must be rendered.
    #[error("no derivation rule for `{path}` of kind {kind}")]
    DerivationGap { path: Id, kind: ElementKind },

    /// A command left notation records whose proxies do not resolve. The
    /// command was reverted.
    #[error("command `{command}` left {} dangling notation record(s)", .dangling.len())]
    Inconsistent { command: String, dangling: Vec<Id> },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("diagram session lock was poisoned")]
    SessionPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl TandemError {
    /// Create a new `PartialApplication` error.
    pub fn new_partial_application(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PartialApplication {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error was caused by the request rather than by
    /// an internal failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Model(_) | Self::PartialApplication { .. } | Self::InvalidOperation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TandemError>;
