//! Semantic document types.
//!
//! The semantic document is the content half of a diagram: a tree of typed
//! nodes rooted at a single `Model` node. Nodes are addressed by their path
//! (see [`crate::identifier`]).

mod document;
mod kind;

pub use document::{
    DetachedSubtree, RelationshipEnds, SemanticChange, SemanticDocument, SemanticNode,
};
pub use kind::{Category, ElementKind};
