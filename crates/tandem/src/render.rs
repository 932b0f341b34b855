//! Render tree: the ephemeral view model sent to the client.
//!
//! A render tree is rebuilt wholesale by every derivation cycle and owned by
//! the session that derived it. Node identifiers are derived from semantic
//! paths so that the client can address nodes across cycles.

use std::fmt;

use serde::{Serialize, Serializer};

use tandem_core::{
    geometry::{Point, Size},
    identifier::Id,
};

/// Suffix of a container's or classifier's header compartment id.
pub const HEADER_SEGMENT: &str = "header";
/// Suffix of a node's children compartment id.
pub const CHILDREN_SEGMENT: &str = "children";
/// Suffix of a node's text label id.
pub const LABEL_SEGMENT: &str = "label";

/// Kind of a rendered edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Generalization,
    Include,
    Extend,
    Association,
    /// Comment-to-element connector.
    CommentLink,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Generalization => write!(f, "generalization"),
            EdgeKind::Include => write!(f, "include"),
            EdgeKind::Extend => write!(f, "extend"),
            EdgeKind::Association => write!(f, "association"),
            EdgeKind::CommentLink => write!(f, "comment_link"),
        }
    }
}

/// Type tag of a render node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderKind {
    Graph,
    Package,
    Component,
    Class,
    UseCase,
    Actor,
    Comment,
    /// Standalone label of a named element without a dedicated shape.
    Label,
    Header,
    Compartment,
    Text,
    Edge(EdgeKind),
}

impl RenderKind {
    pub fn is_edge(self) -> bool {
        matches!(self, RenderKind::Edge(_))
    }
}

impl fmt::Display for RenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderKind::Graph => write!(f, "graph"),
            RenderKind::Package => write!(f, "package"),
            RenderKind::Component => write!(f, "component"),
            RenderKind::Class => write!(f, "class"),
            RenderKind::UseCase => write!(f, "use_case"),
            RenderKind::Actor => write!(f, "actor"),
            RenderKind::Comment => write!(f, "comment"),
            RenderKind::Label => write!(f, "label"),
            RenderKind::Header => write!(f, "header"),
            RenderKind::Compartment => write!(f, "compartment"),
            RenderKind::Text => write!(f, "text"),
            RenderKind::Edge(kind) => write!(f, "edge:{kind}"),
        }
    }
}

impl Serialize for RenderKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn is_origin(point: &Point) -> bool {
    point.is_zero()
}

/// A node of the render tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    id: Id,
    kind: RenderKind,
    #[serde(skip_serializing_if = "is_origin")]
    position: Point,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<Size>,
    /// Originating semantic node, for round-tripping edits.
    #[serde(skip_serializing_if = "Option::is_none")]
    semantic: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<Id>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    routing: Vec<Point>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<RenderNode>,
}

impl RenderNode {
    pub fn new(id: Id, kind: RenderKind) -> Self {
        Self {
            id,
            kind,
            position: Point::default(),
            size: None,
            semantic: None,
            text: None,
            source: None,
            target: None,
            routing: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a text node with the given content.
    pub fn text(id: Id, text: Option<&str>) -> Self {
        Self::new(id, RenderKind::Text).with_text(text)
    }

    pub fn with_bounds(mut self, position: Point, size: Option<Size>) -> Self {
        self.position = position;
        self.size = size;
        self
    }

    pub fn with_semantic(mut self, semantic: Id) -> Self {
        self.semantic = Some(semantic);
        self
    }

    pub fn with_text(mut self, text: Option<&str>) -> Self {
        self.text = text.map(str::to_string);
        self
    }

    /// Set the ends and routing points of an edge node.
    pub fn with_ends(mut self, source: Id, target: Id, routing: Vec<Point>) -> Self {
        self.source = Some(source);
        self.target = Some(target);
        self.routing = routing;
        self
    }

    pub fn with_child(mut self, child: RenderNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = RenderNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn kind(&self) -> RenderKind {
        self.kind
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Option<Size> {
        self.size
    }

    pub fn semantic(&self) -> Option<Id> {
        self.semantic
    }

    pub fn text_content(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn source(&self) -> Option<Id> {
        self.source
    }

    pub fn target(&self) -> Option<Id> {
        self.target
    }

    pub fn routing(&self) -> &[Point] {
        &self.routing
    }

    pub fn children(&self) -> &[RenderNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [RenderNode] {
        &mut self.children
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub fn set_size(&mut self, size: Option<Size>) {
        self.size = size;
    }

    /// Direct child with the given id.
    pub fn child(&self, id: Id) -> Option<&RenderNode> {
        self.children.iter().find(|child| child.id == id)
    }

    /// Depth-first search for `id` in this subtree.
    pub fn find(&self, id: Id) -> Option<&RenderNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: Id) -> Option<&mut RenderNode> {
        if self.id == id {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(id))
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a RenderNode>) {
        out.push(self);
        for child in &self.children {
            child.collect(out);
        }
    }
}

/// A derived render tree tagged with the revision it was derived at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderTree {
    revision: u64,
    root: RenderNode,
}

impl RenderTree {
    pub fn new(revision: u64, root: RenderNode) -> Self {
        Self { revision, root }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn root(&self) -> &RenderNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut RenderNode {
        &mut self.root
    }

    /// Look up a node anywhere in the tree.
    pub fn find(&self, id: Id) -> Option<&RenderNode> {
        self.root.find(id)
    }

    pub fn find_mut(&mut self, id: Id) -> Option<&mut RenderNode> {
        self.root.find_mut(id)
    }

    /// All nodes in pre-order, root first.
    pub fn walk(&self) -> Vec<&RenderNode> {
        let mut out = Vec::new();
        self.root.collect(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RenderTree {
        let package = Id::new("model::package_1");
        let root = RenderNode::new(Id::new("model"), RenderKind::Graph)
            .with_child(
                RenderNode::new(package, RenderKind::Package)
                    .with_semantic(package)
                    .with_child(RenderNode::new(
                        package.nested(HEADER_SEGMENT),
                        RenderKind::Header,
                    ))
                    .with_child(RenderNode::new(
                        package.nested(CHILDREN_SEGMENT),
                        RenderKind::Compartment,
                    )),
            )
            .with_child(
                RenderNode::new(Id::new("model::include_2"), RenderKind::Edge(EdgeKind::Include))
                    .with_ends(Id::new("model::a"), Id::new("model::b"), Vec::new()),
            );
        RenderTree::new(4, root)
    }

    #[test]
    fn test_find_nested() {
        let tree = sample();
        let id = Id::new("model::package_1::children");

        let node = tree.find(id).unwrap();
        assert_eq!(node.kind(), RenderKind::Compartment);
        assert!(tree.find(Id::new("model::missing")).is_none());
    }

    #[test]
    fn test_find_mut_updates_in_place() {
        let mut tree = sample();
        let id = Id::new("model::package_1");

        tree.find_mut(id)
            .unwrap()
            .set_size(Some(Size::new(10.0, 20.0)));

        assert_eq!(tree.find(id).unwrap().size(), Some(Size::new(10.0, 20.0)));
    }

    #[test]
    fn test_walk_pre_order() {
        let tree = sample();
        let ids: Vec<String> = tree.walk().iter().map(|n| n.id().to_string()).collect();

        assert_eq!(
            ids,
            vec![
                "model",
                "model::package_1",
                "model::package_1::header",
                "model::package_1::children",
                "model::include_2",
            ]
        );
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(RenderKind::UseCase.to_string(), "use_case");
        assert_eq!(
            RenderKind::Edge(EdgeKind::CommentLink).to_string(),
            "edge:comment_link"
        );
        assert!(RenderKind::Edge(EdgeKind::Extend).is_edge());
    }
}
