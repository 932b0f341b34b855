//! Element kinds and their categories.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identifier::Id;

/// Type tag of a semantic node.
///
/// The catalogue is open: kinds the engine has no dedicated handling for can
/// be carried as [`ElementKind::Custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// The document root.
    Model,
    Package,
    Component,
    Class,
    UseCase,
    Actor,
    Comment,
    /// Attribute of a class.
    Property,
    /// Extension point of a use case.
    ExtensionPoint,
    Generalization,
    Include,
    Extend,
    Association,
    /// Kind outside the built-in catalogue. `named` tells whether the element
    /// behaves as a named element.
    Custom { tag: Id, named: bool },
}

/// Coarse grouping of element kinds.
///
/// Every [`ElementKind`] maps to exactly one category; the mapping is an
/// exhaustive match so a new kind cannot be added without choosing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Root,
    /// Package-like elements that own other elements and render with a header
    /// and a children compartment.
    Container,
    /// Leaf classifiers: classes, use cases, actors.
    Classifier,
    /// Comments. Their links to annotated elements are attributes, not nodes.
    Annotation,
    /// Owned features rendered inside their classifier (properties, extension points).
    Feature,
    Relationship,
    Other,
}

impl ElementKind {
    /// Returns the category of this kind.
    pub fn category(self) -> Category {
        match self {
            ElementKind::Model => Category::Root,
            ElementKind::Package | ElementKind::Component => Category::Container,
            ElementKind::Class | ElementKind::UseCase | ElementKind::Actor => Category::Classifier,
            ElementKind::Comment => Category::Annotation,
            ElementKind::Property | ElementKind::ExtensionPoint => Category::Feature,
            ElementKind::Generalization
            | ElementKind::Include
            | ElementKind::Extend
            | ElementKind::Association => Category::Relationship,
            ElementKind::Custom { .. } => Category::Other,
        }
    }

    pub fn is_container(self) -> bool {
        self.category() == Category::Container
    }

    pub fn is_classifier(self) -> bool {
        self.category() == Category::Classifier
    }

    pub fn is_relationship(self) -> bool {
        self.category() == Category::Relationship
    }

    /// Returns `true` for kinds that behave as named elements.
    ///
    /// Relationships are excluded: their optional name is shown as an edge
    /// label, never as a standalone node. Comments carry a body, not a name.
    pub fn is_named_element(self) -> bool {
        match self.category() {
            Category::Root | Category::Container | Category::Classifier | Category::Feature => {
                true
            }
            Category::Annotation | Category::Relationship => false,
            Category::Other => matches!(self, ElementKind::Custom { named: true, .. }),
        }
    }

    /// Returns `true` if an element of this kind has its own notation record.
    ///
    /// Features are drawn inside their classifier and have none.
    pub fn has_notation(self) -> bool {
        !matches!(self.category(), Category::Root | Category::Feature)
    }

    /// Returns `true` if `self` may own an element of kind `child`.
    pub fn can_own(self, child: ElementKind) -> bool {
        match child.category() {
            Category::Root => false,
            Category::Container | Category::Classifier => {
                matches!(self.category(), Category::Root | Category::Container)
            }
            Category::Annotation => self == ElementKind::Model,
            Category::Feature => match child {
                ElementKind::Property => self == ElementKind::Class,
                ElementKind::ExtensionPoint => self == ElementKind::UseCase,
                _ => false,
            },
            // Relationship owners are chosen by the engine, not the client.
            Category::Relationship => self != ElementKind::Comment,
            Category::Other => matches!(self.category(), Category::Root | Category::Container),
        }
    }

    /// Prefix used when generating path segments for new elements.
    pub fn segment_prefix(self) -> &'static str {
        match self {
            ElementKind::Model => "model",
            ElementKind::Package => "package",
            ElementKind::Component => "component",
            ElementKind::Class => "class",
            ElementKind::UseCase => "use_case",
            ElementKind::Actor => "actor",
            ElementKind::Comment => "comment",
            ElementKind::Property => "property",
            ElementKind::ExtensionPoint => "extension_point",
            ElementKind::Generalization => "generalization",
            ElementKind::Include => "include",
            ElementKind::Extend => "extend",
            ElementKind::Association => "association",
            ElementKind::Custom { .. } => "element",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Model => write!(f, "Model"),
            ElementKind::Package => write!(f, "Package"),
            ElementKind::Component => write!(f, "Component"),
            ElementKind::Class => write!(f, "Class"),
            ElementKind::UseCase => write!(f, "UseCase"),
            ElementKind::Actor => write!(f, "Actor"),
            ElementKind::Comment => write!(f, "Comment"),
            ElementKind::Property => write!(f, "Property"),
            ElementKind::ExtensionPoint => write!(f, "ExtensionPoint"),
            ElementKind::Generalization => write!(f, "Generalization"),
            ElementKind::Include => write!(f, "Include"),
            ElementKind::Extend => write!(f, "Extend"),
            ElementKind::Association => write!(f, "Association"),
            ElementKind::Custom { tag, .. } => write!(f, "{tag}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(ElementKind::Package.category(), Category::Container);
        assert_eq!(ElementKind::Actor.category(), Category::Classifier);
        assert_eq!(ElementKind::Include.category(), Category::Relationship);
        assert_eq!(ElementKind::ExtensionPoint.category(), Category::Feature);
    }

    #[test]
    fn test_relationships_are_not_named_elements() {
        assert!(!ElementKind::Include.is_named_element());
        assert!(!ElementKind::Comment.is_named_element());
        assert!(ElementKind::Property.is_named_element());
    }

    #[test]
    fn test_custom_named_flag() {
        let tag = Id::new("Signal");
        assert!(ElementKind::Custom { tag, named: true }.is_named_element());
        assert!(!ElementKind::Custom { tag, named: false }.is_named_element());
    }

    #[test]
    fn test_ownership_rules() {
        assert!(ElementKind::Model.can_own(ElementKind::Package));
        assert!(ElementKind::Component.can_own(ElementKind::UseCase));
        assert!(ElementKind::UseCase.can_own(ElementKind::ExtensionPoint));
        assert!(!ElementKind::UseCase.can_own(ElementKind::Actor));
        assert!(!ElementKind::Package.can_own(ElementKind::Comment));
        assert!(!ElementKind::Class.can_own(ElementKind::ExtensionPoint));
    }

    #[test]
    fn test_display() {
        assert_eq!(ElementKind::UseCase.to_string(), "UseCase");
        let tag = Id::new("Signal");
        assert_eq!(ElementKind::Custom { tag, named: true }.to_string(), "Signal");
    }
}
