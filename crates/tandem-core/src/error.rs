//! Error types for document lookups and primitive mutations.

use thiserror::Error;

use crate::{identifier::Id, semantic::ElementKind};

/// Errors raised by the semantic and notation documents.
///
/// Every variant is a rejection: the document is left untouched when one of
/// these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("element not found: `{0}`")]
    NotFound(Id),

    #[error("type mismatch at `{path}`: expected {expected}, found {found}")]
    TypeMismatch {
        path: Id,
        expected: String,
        found: ElementKind,
    },

    #[error("`{parent}` cannot own a {kind} element")]
    InvalidParent { parent: Id, kind: ElementKind },

    #[error("the document root `{0}` cannot be removed or re-owned")]
    RootImmutable(Id),

    #[error("element `{0}` already exists")]
    DuplicateElement(Id),

    #[error("notation record `{0}` already exists")]
    DuplicateRecord(Id),

    #[error("notation record not found: `{0}`")]
    RecordNotFound(Id),

    #[error("notation record `{key}` is not a {expected}")]
    GeometryMismatch { key: Id, expected: &'static str },
}

pub type Result<T> = std::result::Result<T, ModelError>;
