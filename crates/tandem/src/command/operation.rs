//! Client edit requests.

use serde::Deserialize;

use tandem_core::{
    geometry::{Point, Size},
    identifier::Id,
    semantic::ElementKind,
};

/// An edit requested by the client. Each operation becomes one compound
/// command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Create an element at an absolute diagram position, optionally inside
    /// `parent`.
    AddElement {
        kind: ElementKind,
        #[serde(default)]
        position: Point,
        #[serde(default)]
        parent: Option<Id>,
        #[serde(default)]
        name: Option<String>,
    },
    AddRelationship {
        kind: ElementKind,
        source: Id,
        target: Id,
        #[serde(default)]
        name: Option<String>,
    },
    AddCommentEdge {
        comment: Id,
        target: Id,
    },
    /// Remove an element and everything that depends on it.
    Remove {
        target: Id,
        #[serde(default)]
        expected: Option<ElementKind>,
    },
    /// Remove the elements behind a selection of render node ids.
    Delete {
        element_ids: Vec<Id>,
    },
    RemoveCommentEdge {
        comment: Id,
        target: Id,
    },
    SetName {
        target: Id,
        expected: ElementKind,
        #[serde(default)]
        name: Option<String>,
    },
    /// Move or resize a shape. `position` is in the coordinates of the
    /// shape's container.
    ChangeBounds {
        target: Id,
        #[serde(default)]
        position: Option<Point>,
        #[serde(default)]
        size: Option<Size>,
    },
    /// Replace the routing points of an edge or connector record.
    Reroute {
        target: Id,
        routing: Vec<Point>,
    },
}

impl Operation {
    /// Short human-readable label, used for logging and the undo history.
    pub fn label(&self) -> String {
        match self {
            Operation::AddElement { kind, .. } => format!("add {kind}"),
            Operation::AddRelationship { kind, .. } => format!("add {kind}"),
            Operation::AddCommentEdge { .. } => "add comment edge".to_string(),
            Operation::Remove { target, .. } => format!("remove {target}"),
            Operation::Delete { element_ids } => format!("delete {} element(s)", element_ids.len()),
            Operation::RemoveCommentEdge { .. } => "remove comment edge".to_string(),
            Operation::SetName { target, .. } => format!("rename {target}"),
            Operation::ChangeBounds { target, .. } => format!("change bounds of {target}"),
            Operation::Reroute { target, .. } => format!("reroute {target}"),
        }
    }
}
