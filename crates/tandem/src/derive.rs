//! View derivation: builds a render tree from a semantic and a notation
//! document.
//!
//! Dispatch is by element kind through a closed set of [`Rule`]s evaluated in
//! a fixed priority order; the first rule that applies wins. Only the direct
//! children of the document root are enumerated by the root passes; nested
//! elements are rendered by their container's rule. Relationships are the
//! exception: they are collected from a full walk of the content tree and
//! attached as top-level edges.

use log::{debug, info, trace};
use serde::Deserialize;

use tandem_core::{
    geometry::{Point, Size},
    identifier::Id,
    notation::{DocumentPair, NotationRecord},
    semantic::{Category, ElementKind, SemanticNode},
};

use crate::{
    error::{Result, TandemError},
    render::{
        CHILDREN_SEGMENT, EdgeKind, HEADER_SEGMENT, LABEL_SEGMENT, RenderKind, RenderNode,
        RenderTree,
    },
};

/// Diagram type selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramKind {
    #[default]
    UseCase,
    Class,
}

/// Derivation rule for one group of element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Package,
    Component,
    Class,
    UseCase,
    Actor,
    Comment,
    /// Generic label for named elements without a dedicated rule.
    NamedElement,
    Relationship,
}

impl Rule {
    /// Rules in the order they are tried. Containers come before leaf
    /// classifiers, which come before the named-element fallback.
    pub const PRIORITY: [Rule; 8] = [
        Rule::Package,
        Rule::Component,
        Rule::Class,
        Rule::UseCase,
        Rule::Actor,
        Rule::Comment,
        Rule::NamedElement,
        Rule::Relationship,
    ];

    /// Rules that may apply to elements of `category`.
    fn candidates(category: Category) -> &'static [Rule] {
        match category {
            Category::Root => &[],
            Category::Container => &[Rule::Package, Rule::Component, Rule::NamedElement],
            Category::Classifier => &[Rule::Class, Rule::UseCase, Rule::Actor, Rule::NamedElement],
            Category::Annotation => &[Rule::Comment],
            Category::Feature => &[Rule::NamedElement],
            Category::Relationship => &[Rule::Relationship],
            Category::Other => &[Rule::NamedElement],
        }
    }

    fn applies_to(self, kind: ElementKind) -> bool {
        match self {
            Rule::Package => kind == ElementKind::Package,
            Rule::Component => kind == ElementKind::Component,
            Rule::Class => kind == ElementKind::Class,
            Rule::UseCase => kind == ElementKind::UseCase,
            Rule::Actor => kind == ElementKind::Actor,
            Rule::Comment => kind == ElementKind::Comment,
            Rule::NamedElement => kind.is_named_element(),
            Rule::Relationship => kind.is_relationship(),
        }
    }

    /// Select the rule for `kind`, or `None` if no rule applies.
    pub fn select(kind: ElementKind) -> Option<Rule> {
        let candidates = Self::candidates(kind.category());
        Self::PRIORITY
            .into_iter()
            .find(|rule| candidates.contains(rule) && rule.applies_to(kind))
    }
}

/// Derive the render tree for `pair` as a diagram of type `kind`.
///
/// # Errors
///
/// Returns [`TandemError::DerivationGap`] if a node that must be rendered has
/// no matching rule.
pub fn derive(kind: DiagramKind, pair: &DocumentPair, revision: u64) -> Result<RenderTree> {
    info!(diagram_kind:? = kind, revision; "Deriving render tree");
    let deriver = Deriver { pair };
    let root = deriver.root(kind)?;
    Ok(RenderTree::new(revision, root))
}

struct Deriver<'a> {
    pair: &'a DocumentPair,
}

impl Deriver<'_> {
    fn root(&self, kind: DiagramKind) -> Result<RenderNode> {
        let semantic = &self.pair.semantic;
        let root_path = semantic.root();
        let mut graph = RenderNode::new(root_path, RenderKind::Graph).with_semantic(root_path);

        let passes: &[ElementKind] = match kind {
            DiagramKind::UseCase => &[
                ElementKind::Component,
                ElementKind::Package,
                ElementKind::UseCase,
                ElementKind::Actor,
            ],
            DiagramKind::Class => &[ElementKind::Package, ElementKind::Class],
        };
        for pass in passes {
            for node in semantic.children(root_path).filter(|n| n.kind() == *pass) {
                graph = graph.with_child(self.element(node)?);
            }
        }

        for comment in semantic
            .children(root_path)
            .filter(|n| n.kind() == ElementKind::Comment)
        {
            graph = graph.with_child(self.element(comment)?);
            graph = graph.with_children(self.connectors(comment));
        }

        for relationship in semantic.walk().into_iter().filter(|n| n.kind().is_relationship()) {
            let drawn = relationship.ends().is_some_and(|ends| {
                graph.find(ends.source()).is_some() && graph.find(ends.target()).is_some()
            });
            if !drawn {
                debug!(path:% = relationship.path(); "Relationship end not rendered, skipping edge");
                continue;
            }
            graph = graph.with_child(self.element(relationship)?);
        }

        trace!(children = graph.children().len(); "Derived root");
        Ok(graph)
    }

    fn element(&self, node: &SemanticNode) -> Result<RenderNode> {
        let rule = Rule::select(node.kind()).ok_or(TandemError::DerivationGap {
            path: node.path(),
            kind: node.kind(),
        })?;
        trace!(path:% = node.path(), rule:?; "Dispatching element");
        match rule {
            Rule::Package => self.container(node, RenderKind::Package),
            Rule::Component => self.container(node, RenderKind::Component),
            Rule::Class => self.class(node),
            Rule::UseCase => self.use_case(node),
            Rule::Actor => Ok(self.shape(node, RenderKind::Actor).with_child(self.label(node))),
            Rule::Comment => Ok(self.shape(node, RenderKind::Comment).with_child(self.label(node))),
            Rule::NamedElement => Ok(self
                .shape(node, RenderKind::Label)
                .with_text(node.name())),
            Rule::Relationship => Ok(self.relationship(node)),
        }
    }

    /// Node carrying the bounds of the element's shape record.
    fn shape(&self, node: &SemanticNode, kind: RenderKind) -> RenderNode {
        let path = node.path();
        let (position, size) = self.bounds(path);
        RenderNode::new(path, kind)
            .with_bounds(position, size)
            .with_semantic(path)
    }

    fn bounds(&self, path: Id) -> (Point, Option<Size>) {
        match self
            .pair
            .notation
            .shape_for(path)
            .and_then(NotationRecord::bounds)
        {
            Some(bounds) => bounds,
            None => {
                if node_has_notation(self.pair, path) {
                    debug!(path:%; "No shape record, rendering at origin");
                }
                (Point::default(), None)
            }
        }
    }

    fn label(&self, node: &SemanticNode) -> RenderNode {
        RenderNode::text(node.path().nested(LABEL_SEGMENT), node.name())
    }

    fn header(&self, node: &SemanticNode) -> RenderNode {
        RenderNode::new(node.path().nested(HEADER_SEGMENT), RenderKind::Header)
            .with_child(self.label(node))
    }

    fn container(&self, node: &SemanticNode, kind: RenderKind) -> Result<RenderNode> {
        let compartment = self.compartment(node)?;
        Ok(self
            .shape(node, kind)
            .with_child(self.header(node))
            .with_child(compartment))
    }

    fn class(&self, node: &SemanticNode) -> Result<RenderNode> {
        let compartment = self.compartment(node)?;
        Ok(self
            .shape(node, RenderKind::Class)
            .with_child(self.header(node))
            .with_child(compartment))
    }

    fn use_case(&self, node: &SemanticNode) -> Result<RenderNode> {
        let mut rendered = self.shape(node, RenderKind::UseCase).with_child(self.label(node));
        for child in ordered_children(self.pair, node.path()) {
            rendered = rendered.with_child(self.element(child)?);
        }
        Ok(rendered)
    }

    /// Children compartment holding the element's non-relationship children
    /// in categorical order.
    fn compartment(&self, node: &SemanticNode) -> Result<RenderNode> {
        let mut compartment =
            RenderNode::new(node.path().nested(CHILDREN_SEGMENT), RenderKind::Compartment);
        for child in ordered_children(self.pair, node.path()) {
            compartment = compartment.with_child(self.element(child)?);
        }
        Ok(compartment)
    }

    fn relationship(&self, node: &SemanticNode) -> RenderNode {
        let path = node.path();
        let routing = self
            .pair
            .notation
            .edge_for(path)
            .and_then(NotationRecord::routing)
            .map(<[Point]>::to_vec)
            .unwrap_or_default();
        let edge = RenderNode::new(path, RenderKind::Edge(edge_kind(node.kind())))
            .with_semantic(path)
            .with_text(node.name());
        match node.ends() {
            Some(ends) => edge.with_ends(ends.source(), ends.target(), routing),
            None => edge,
        }
    }

    /// Connector edges of a comment, in notation order.
    fn connectors(&self, comment: &SemanticNode) -> Vec<RenderNode> {
        self.pair
            .notation
            .records_for(comment.path())
            .filter_map(|record| {
                let target = record.connector_target()?;
                let routing = record.routing().map(<[Point]>::to_vec).unwrap_or_default();
                Some(
                    RenderNode::new(record.key(), RenderKind::Edge(EdgeKind::CommentLink))
                        .with_semantic(comment.path())
                        .with_ends(comment.path(), target, routing),
                )
            })
            .collect()
    }
}

fn node_has_notation(pair: &DocumentPair, path: Id) -> bool {
    pair.semantic
        .get(path)
        .is_some_and(|node| node.kind().has_notation())
}

fn edge_kind(kind: ElementKind) -> EdgeKind {
    match kind {
        ElementKind::Generalization => EdgeKind::Generalization,
        ElementKind::Include => EdgeKind::Include,
        ElementKind::Extend => EdgeKind::Extend,
        _ => EdgeKind::Association,
    }
}

/// Rank of a child within its sibling group: containers by kind, then
/// classifiers by kind, then everything else.
fn categorical_rank(kind: ElementKind) -> usize {
    match kind {
        ElementKind::Component => 0,
        ElementKind::Package => 1,
        ElementKind::UseCase => 2,
        ElementKind::Actor => 3,
        ElementKind::Class => 4,
        ElementKind::Comment => 5,
        _ => 6,
    }
}

/// Non-relationship children of `path`, stably sorted by categorical rank.
fn ordered_children(pair: &DocumentPair, path: Id) -> Vec<&SemanticNode> {
    let mut children: Vec<&SemanticNode> = pair
        .semantic
        .children(path)
        .filter(|child| !child.kind().is_relationship())
        .collect();
    children.sort_by_key(|child| categorical_rank(child.kind()));
    children
}

#[cfg(test)]
mod tests {
    use tandem_core::notation::NotationChange;

    use super::*;

    #[test]
    fn test_rule_priority() {
        assert_eq!(Rule::select(ElementKind::Package), Some(Rule::Package));
        assert_eq!(Rule::select(ElementKind::UseCase), Some(Rule::UseCase));
        assert_eq!(Rule::select(ElementKind::Property), Some(Rule::NamedElement));
        assert_eq!(Rule::select(ElementKind::Include), Some(Rule::Relationship));
        assert_eq!(Rule::select(ElementKind::Model), None);

        let tag = Id::new("Signal");
        assert_eq!(
            Rule::select(ElementKind::Custom { tag, named: true }),
            Some(Rule::NamedElement)
        );
        assert_eq!(Rule::select(ElementKind::Custom { tag, named: false }), None);
    }

    #[test]
    fn test_root_pass_order() {
        let mut pair = DocumentPair::new("model");
        let root = pair.semantic.root();
        let actor = pair.semantic.create(root, ElementKind::Actor, Some("A")).unwrap();
        let use_case = pair.semantic.create(root, ElementKind::UseCase, Some("U")).unwrap();
        let package = pair.semantic.create(root, ElementKind::Package, Some("P")).unwrap();
        let component = pair.semantic.create(root, ElementKind::Component, Some("C")).unwrap();

        let tree = derive(DiagramKind::UseCase, &pair, 0).unwrap();
        let order: Vec<Id> = tree.root().children().iter().map(RenderNode::id).collect();

        assert_eq!(order, vec![component, package, use_case, actor]);
    }

    #[test]
    fn test_container_structure() {
        let mut pair = DocumentPair::new("model");
        let root = pair.semantic.root();
        let package = pair.semantic.create(root, ElementKind::Package, Some("P")).unwrap();
        let actor = pair.semantic.create(package, ElementKind::Actor, Some("A")).unwrap();
        pair.notation
            .apply(NotationChange::InsertRecord {
                index: 0,
                record: NotationRecord::shape(
                    package,
                    Point::new(10.0, 10.0),
                    Some(Size::new(100.0, 80.0)),
                ),
            })
            .unwrap();

        let tree = derive(DiagramKind::UseCase, &pair, 3).unwrap();
        assert_eq!(tree.revision(), 3);

        let rendered = tree.find(package).unwrap();
        assert_eq!(rendered.kind(), RenderKind::Package);
        assert_eq!(rendered.position(), Point::new(10.0, 10.0));
        assert_eq!(rendered.children()[0].kind(), RenderKind::Header);
        assert_eq!(rendered.children()[1].id(), package.nested(CHILDREN_SEGMENT));
        assert_eq!(rendered.children()[1].children()[0].id(), actor);
        // Nested elements only appear through their container.
        assert!(tree.root().child(actor).is_none());
    }

    #[test]
    fn test_unnamed_custom_kind_is_a_gap() {
        let mut pair = DocumentPair::new("model");
        let root = pair.semantic.root();
        let package = pair.semantic.create(root, ElementKind::Package, None).unwrap();
        let tag = Id::new("Signal");
        let signal = pair
            .semantic
            .create(package, ElementKind::Custom { tag, named: false }, None)
            .unwrap();

        let err = derive(DiagramKind::UseCase, &pair, 0).unwrap_err();
        assert!(matches!(err, TandemError::DerivationGap { path, .. } if path == signal));
    }

    #[test]
    fn test_class_diagram_passes() {
        let mut pair = DocumentPair::new("model");
        let root = pair.semantic.root();
        let class = pair.semantic.create(root, ElementKind::Class, Some("Order")).unwrap();
        let property = pair
            .semantic
            .create(class, ElementKind::Property, Some("total"))
            .unwrap();
        pair.semantic.create(root, ElementKind::Actor, Some("A")).unwrap();

        let tree = derive(DiagramKind::Class, &pair, 0).unwrap();

        assert_eq!(tree.root().children().len(), 1);
        let label = tree.find(property).unwrap();
        assert_eq!(label.kind(), RenderKind::Label);
        assert_eq!(label.text_content(), Some("total"));
    }

    #[test]
    fn test_edges_need_both_ends_rendered() {
        let mut pair = DocumentPair::new("model");
        let root = pair.semantic.root();
        let order = pair.semantic.create(root, ElementKind::Class, Some("Order")).unwrap();
        let item = pair.semantic.create(root, ElementKind::Class, Some("Item")).unwrap();
        let checkout = pair.semantic.create(root, ElementKind::UseCase, Some("Checkout")).unwrap();
        let pay = pair.semantic.create(root, ElementKind::UseCase, Some("Pay")).unwrap();
        let include = pair
            .semantic
            .create_relationship(checkout, ElementKind::Include, checkout, pay)
            .unwrap();
        let association = pair
            .semantic
            .create_relationship(root, ElementKind::Association, order, item)
            .unwrap();

        let class_tree = derive(DiagramKind::Class, &pair, 0).unwrap();
        assert!(class_tree.find(include).is_none());
        let edge = class_tree.find(association).unwrap();
        assert_eq!(edge.source(), Some(order));
        assert_eq!(edge.target(), Some(item));

        let use_case_tree = derive(DiagramKind::UseCase, &pair, 0).unwrap();
        assert!(use_case_tree.find(include).is_some());
        assert!(use_case_tree.find(association).is_none());
    }
}
