//! Error adapter for converting TandemError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI. Every error gets a
//! stable diagnostic code; rejections of a script step also get a hint.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan};

use tandem::{ModelError, TandemError, semantic::ElementKind};

/// Adapter implementing [`MietteDiagnostic`] for a [`TandemError`].
pub struct ErrorAdapter<'a>(pub &'a TandemError);

impl ErrorAdapter<'_> {
    /// Stable diagnostic code of the wrapped error.
    pub fn code_str(&self) -> &'static str {
        match self.0 {
            TandemError::Model(err) => match err {
                ModelError::NotFound(_) => "tandem::not_found",
                ModelError::TypeMismatch { .. } => "tandem::type_mismatch",
                ModelError::InvalidParent { .. } => "tandem::invalid_parent",
                ModelError::RootImmutable(_) => "tandem::root_immutable",
                ModelError::DuplicateElement(_) => "tandem::duplicate_element",
                ModelError::DuplicateRecord(_) => "tandem::duplicate_record",
                ModelError::RecordNotFound(_) => "tandem::record_not_found",
                ModelError::GeometryMismatch { .. } => "tandem::geometry_mismatch",
            },
            TandemError::PartialApplication { .. } => "tandem::partial_application",
            TandemError::DerivationGap { .. } => "tandem::derivation_gap",
            TandemError::Inconsistent { .. } => "tandem::inconsistent",
            TandemError::InvalidOperation(_) => "tandem::invalid_operation",
            TandemError::Store(_) => "tandem::store",
            TandemError::SessionPoisoned => "tandem::session_poisoned",
            TandemError::Io(_) => "tandem::io",
            TandemError::Config(_) => "tandem::config",
        }
    }

    fn help_text(&self) -> Option<String> {
        match self.0 {
            TandemError::Model(ModelError::NotFound(_)) => {
                Some("paths are assigned on creation, e.g. `model::package_1`".to_string())
            }
            TandemError::Model(ModelError::InvalidParent { kind, .. })
                if *kind == ElementKind::Comment =>
            {
                Some("comments can only be added to the diagram root".to_string())
            }
            TandemError::Model(ModelError::InvalidParent { .. }) => {
                Some("containers and classifiers belong in the root or a container".to_string())
            }
            TandemError::DerivationGap { .. } => {
                Some("give the element a name or move it out of the diagram".to_string())
            }
            _ if self.0.is_rejection() => {
                Some("the documents were left unchanged".to_string())
            }
            _ => None,
        }
    }
}

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(self.0)
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.code_str()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help_text()
            .map(|help| Box::new(help) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        None
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use tandem::identifier::Id;

    use super::*;

    #[test]
    fn test_model_error_codes() {
        let err = TandemError::from(ModelError::NotFound(Id::new("model::actor_7")));
        let adapter = ErrorAdapter(&err);

        assert_eq!(adapter.code_str(), "tandem::not_found");
        assert_eq!(adapter.to_string(), "element not found: `model::actor_7`");
        assert!(adapter.help().is_some());
    }

    #[test]
    fn test_comment_parent_help() {
        let err = TandemError::from(ModelError::InvalidParent {
            parent: Id::new("model::package_1"),
            kind: ElementKind::Comment,
        });
        let adapter = ErrorAdapter(&err);

        assert_eq!(adapter.code_str(), "tandem::invalid_parent");
        assert_eq!(
            adapter.help().map(|h| h.to_string()).as_deref(),
            Some("comments can only be added to the diagram root")
        );
    }

    #[test]
    fn test_internal_error_has_no_help() {
        let err = TandemError::SessionPoisoned;
        let adapter = ErrorAdapter(&err);

        assert_eq!(adapter.code_str(), "tandem::session_poisoned");
        assert!(adapter.help().is_none());
    }
}
