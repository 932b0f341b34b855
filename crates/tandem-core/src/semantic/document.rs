//! The semantic document: an owned tree of typed content nodes.

use std::collections::HashMap;

use log::trace;

use crate::{
    error::{ModelError, Result},
    identifier::Id,
    semantic::kind::ElementKind,
};

/// Source and target of a relationship node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipEnds {
    source: Id,
    target: Id,
}

impl RelationshipEnds {
    pub fn new(source: Id, target: Id) -> Self {
        Self { source, target }
    }

    pub fn source(self) -> Id {
        self.source
    }

    pub fn target(self) -> Id {
        self.target
    }

    /// Returns `true` if either end lies within `path`.
    pub fn touches(self, path: Id) -> bool {
        self.source.is_within(path) || self.target.is_within(path)
    }
}

/// A typed content element.
///
/// `owner` and `children` are maintained by [`SemanticDocument`] only, which
/// keeps them bidirectionally consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticNode {
    path: Id,
    kind: ElementKind,
    name: Option<String>,
    owner: Option<Id>,
    children: Vec<Id>,
    ends: Option<RelationshipEnds>,
    annotated: Vec<Id>,
}

impl SemanticNode {
    /// Create a detached node. It gets an owner once inserted into a document.
    pub fn new(path: Id, kind: ElementKind) -> Self {
        Self {
            path,
            kind,
            name: None,
            owner: None,
            children: Vec::new(),
            ends: None,
            annotated: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn with_ends(mut self, ends: RelationshipEnds) -> Self {
        self.ends = Some(ends);
        self
    }

    /// Get the stable path of this node.
    pub fn path(&self) -> Id {
        self.path
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the owning node's path; `None` only for the document root.
    pub fn owner(&self) -> Option<Id> {
        self.owner
    }

    /// Paths of the owned children, in declaration order.
    pub fn children(&self) -> &[Id] {
        &self.children
    }

    /// Relationship ends, present for relationship kinds only.
    pub fn ends(&self) -> Option<RelationshipEnds> {
        self.ends
    }

    /// Elements annotated by this comment.
    pub fn annotated(&self) -> &[Id] {
        &self.annotated
    }
}

/// A node together with all of its descendants, detached from a document.
///
/// Nodes are stored in pre-order; the first node is the subtree root.
#[derive(Debug, Clone, PartialEq)]
pub struct DetachedSubtree {
    nodes: Vec<SemanticNode>,
}

impl DetachedSubtree {
    /// Wrap a single fresh node.
    pub fn single(node: SemanticNode) -> Self {
        Self { nodes: vec![node] }
    }

    /// Path of the subtree root.
    pub fn root_path(&self) -> Option<Id> {
        self.nodes.first().map(SemanticNode::path)
    }

    pub fn nodes(&self) -> &[SemanticNode] {
        &self.nodes
    }
}

/// Primitive mutation of a [`SemanticDocument`].
///
/// [`SemanticDocument::apply`] returns the inverse change, which restores the
/// previous state when applied in turn.
#[derive(Debug, Clone, PartialEq)]
pub enum SemanticChange {
    InsertSubtree {
        owner: Id,
        index: usize,
        subtree: DetachedSubtree,
    },
    DetachSubtree {
        path: Id,
    },
    SetName {
        path: Id,
        name: Option<String>,
    },
    SetAnnotated {
        path: Id,
        annotated: Vec<Id>,
    },
    SetCounter {
        value: u64,
    },
}

/// Owned tree of semantic nodes rooted at a `Model` node.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticDocument {
    root: Id,
    nodes: HashMap<Id, SemanticNode>,
    counter: u64,
}

impl SemanticDocument {
    /// Create a document holding only a root `Model` node at path `root`.
    pub fn new(root: &str) -> Self {
        let path = Id::new(root);
        let node = SemanticNode::new(path, ElementKind::Model).with_name(Some(root.to_string()));
        Self {
            root: path,
            nodes: HashMap::from([(path, node)]),
            counter: 0,
        }
    }

    pub fn root(&self) -> Id {
        self.root
    }

    pub fn root_node(&self) -> &SemanticNode {
        &self.nodes[&self.root]
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn contains(&self, path: Id) -> bool {
        self.nodes.contains_key(&path)
    }

    pub fn get(&self, path: Id) -> Option<&SemanticNode> {
        self.nodes.get(&path)
    }

    /// Resolve a path to its node.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotFound`] if no live node has this path.
    pub fn resolve(&self, path: Id) -> Result<&SemanticNode> {
        self.nodes.get(&path).ok_or(ModelError::NotFound(path))
    }

    /// Resolve a path and assert the node's kind.
    pub fn resolve_kind(&self, path: Id, expected: ElementKind) -> Result<&SemanticNode> {
        self.resolve_where(path, &expected.to_string(), |kind| kind == expected)
    }

    /// Resolve a path and assert the node's kind with a predicate; `expected`
    /// describes the predicate in the error.
    pub fn resolve_where(
        &self,
        path: Id,
        expected: &str,
        predicate: impl Fn(ElementKind) -> bool,
    ) -> Result<&SemanticNode> {
        let node = self.resolve(path)?;
        if predicate(node.kind) {
            Ok(node)
        } else {
            Err(ModelError::TypeMismatch {
                path,
                expected: expected.to_string(),
                found: node.kind,
            })
        }
    }

    /// Iterate over the direct children of `path` in declaration order.
    pub fn children(&self, path: Id) -> impl Iterator<Item = &SemanticNode> {
        self.nodes
            .get(&path)
            .into_iter()
            .flat_map(|node| node.children.iter())
            .filter_map(|child| self.nodes.get(child))
    }

    /// All descendants of `path` in pre-order, excluding `path` itself.
    pub fn descendants(&self, path: Id) -> Vec<&SemanticNode> {
        let mut out = Vec::new();
        self.collect_descendants(path, &mut out);
        out
    }

    fn collect_descendants<'a>(&'a self, path: Id, out: &mut Vec<&'a SemanticNode>) {
        for child in self.children(path) {
            out.push(child);
            self.collect_descendants(child.path, out);
        }
    }

    /// Pre-order walk over the whole content tree, excluding the root.
    pub fn walk(&self) -> Vec<&SemanticNode> {
        self.descendants(self.root)
    }

    /// Relationships with an end at exactly `path`.
    pub fn relationships_of(&self, path: Id) -> Vec<&SemanticNode> {
        self.walk()
            .into_iter()
            .filter(|node| {
                node.ends
                    .is_some_and(|ends| ends.source == path || ends.target == path)
            })
            .collect()
    }

    /// Comments annotating exactly `path`.
    pub fn annotations_of(&self, path: Id) -> Vec<&SemanticNode> {
        self.walk()
            .into_iter()
            .filter(|node| node.annotated.contains(&path))
            .collect()
    }

    /// Current value of the segment counter.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Compute the path a new element of `kind` would get under `owner`,
    /// together with the counter value that must be stored once it is created.
    pub fn next_path(&self, owner: Id, kind: ElementKind) -> (Id, u64) {
        let mut value = self.counter;
        loop {
            value += 1;
            let path = owner.nested(&format!("{}_{value}", kind.segment_prefix()));
            if !self.nodes.contains_key(&path) {
                return (path, value);
            }
        }
    }

    /// Create a new element under `owner` and return its path.
    ///
    /// Convenience for building documents outside of commands; the inverse
    /// changes are discarded.
    pub fn create(&mut self, owner: Id, kind: ElementKind, name: Option<&str>) -> Result<Id> {
        let (path, counter) = self.next_path(owner, kind);
        let node = SemanticNode::new(path, kind).with_name(name.map(str::to_string));
        let index = self.resolve(owner)?.children.len();
        self.apply(SemanticChange::InsertSubtree {
            owner,
            index,
            subtree: DetachedSubtree::single(node),
        })?;
        self.apply(SemanticChange::SetCounter { value: counter })?;
        Ok(path)
    }

    /// Create a relationship owned by `owner` between `source` and `target`.
    pub fn create_relationship(
        &mut self,
        owner: Id,
        kind: ElementKind,
        source: Id,
        target: Id,
    ) -> Result<Id> {
        self.resolve(source)?;
        self.resolve(target)?;
        let (path, counter) = self.next_path(owner, kind);
        let node = SemanticNode::new(path, kind).with_ends(RelationshipEnds::new(source, target));
        let index = self.resolve(owner)?.children.len();
        self.apply(SemanticChange::InsertSubtree {
            owner,
            index,
            subtree: DetachedSubtree::single(node),
        })?;
        self.apply(SemanticChange::SetCounter { value: counter })?;
        Ok(path)
    }

    /// Attach `target` to `comment`'s annotated elements.
    pub fn annotate(&mut self, comment: Id, target: Id) -> Result<()> {
        self.resolve(target)?;
        let mut annotated = self
            .resolve_kind(comment, ElementKind::Comment)?
            .annotated
            .clone();
        if !annotated.contains(&target) {
            annotated.push(target);
        }
        self.apply(SemanticChange::SetAnnotated {
            path: comment,
            annotated,
        })?;
        Ok(())
    }

    /// Apply a primitive change and return its inverse.
    ///
    /// Every change is validated before anything is written, so an error
    /// leaves the document untouched.
    pub fn apply(&mut self, change: SemanticChange) -> Result<SemanticChange> {
        trace!(change:?; "Applying semantic change");
        match change {
            SemanticChange::InsertSubtree {
                owner,
                index,
                subtree,
            } => self.insert_subtree(owner, index, subtree),
            SemanticChange::DetachSubtree { path } => self.detach_subtree(path),
            SemanticChange::SetName { path, name } => {
                let node = self.nodes.get_mut(&path).ok_or(ModelError::NotFound(path))?;
                let previous = std::mem::replace(&mut node.name, name);
                Ok(SemanticChange::SetName {
                    path,
                    name: previous,
                })
            }
            SemanticChange::SetAnnotated { path, annotated } => {
                if let Some(missing) = annotated.iter().find(|p| !self.nodes.contains_key(p)) {
                    return Err(ModelError::NotFound(*missing));
                }
                let node = self.nodes.get_mut(&path).ok_or(ModelError::NotFound(path))?;
                let previous = std::mem::replace(&mut node.annotated, annotated);
                Ok(SemanticChange::SetAnnotated {
                    path,
                    annotated: previous,
                })
            }
            SemanticChange::SetCounter { value } => {
                let previous = std::mem::replace(&mut self.counter, value);
                Ok(SemanticChange::SetCounter { value: previous })
            }
        }
    }

    fn insert_subtree(
        &mut self,
        owner: Id,
        index: usize,
        subtree: DetachedSubtree,
    ) -> Result<SemanticChange> {
        let owner_kind = self.resolve(owner)?.kind;
        let Some(root) = subtree.nodes.first() else {
            return Err(ModelError::NotFound(owner));
        };
        let root_path = root.path;
        if root_path.parent() != Some(owner) {
            return Err(ModelError::InvalidParent {
                parent: owner,
                kind: root.kind,
            });
        }
        if !owner_kind.can_own(root.kind) {
            return Err(ModelError::InvalidParent {
                parent: owner,
                kind: root.kind,
            });
        }
        if let Some(existing) = subtree
            .nodes
            .iter()
            .find(|node| self.nodes.contains_key(&node.path))
        {
            return Err(ModelError::DuplicateElement(existing.path));
        }

        let mut nodes = subtree.nodes.into_iter();
        if let Some(mut root) = nodes.next() {
            root.owner = Some(owner);
            self.nodes.insert(root_path, root);
        }
        for node in nodes {
            self.nodes.insert(node.path, node);
        }
        let owner_node = self
            .nodes
            .get_mut(&owner)
            .ok_or(ModelError::NotFound(owner))?;
        let index = index.min(owner_node.children.len());
        owner_node.children.insert(index, root_path);

        Ok(SemanticChange::DetachSubtree { path: root_path })
    }

    fn detach_subtree(&mut self, path: Id) -> Result<SemanticChange> {
        if path == self.root {
            return Err(ModelError::RootImmutable(path));
        }
        let node = self.resolve(path)?;
        let owner = node.owner.ok_or(ModelError::RootImmutable(path))?;

        let mut order = vec![path];
        order.extend(self.descendants(path).into_iter().map(SemanticNode::path));

        let owner_node = self
            .nodes
            .get_mut(&owner)
            .ok_or(ModelError::NotFound(owner))?;
        let index = owner_node
            .children
            .iter()
            .position(|child| *child == path)
            .ok_or(ModelError::NotFound(path))?;
        owner_node.children.remove(index);

        let nodes = order
            .into_iter()
            .filter_map(|p| self.nodes.remove(&p))
            .collect();

        Ok(SemanticChange::InsertSubtree {
            owner,
            index,
            subtree: DetachedSubtree { nodes },
        })
    }

    /// Check the bidirectional containment invariant over the whole document.
    pub fn containment_is_consistent(&self) -> bool {
        self.nodes.values().all(|node| {
            let owner_ok = match node.owner {
                None => node.path == self.root,
                Some(owner) => self
                    .nodes
                    .get(&owner)
                    .is_some_and(|o| o.children.iter().filter(|c| **c == node.path).count() == 1),
            };
            let children_ok = node.children.iter().all(|child| {
                self.nodes
                    .get(child)
                    .is_some_and(|c| c.owner == Some(node.path))
            });
            owner_ok && children_ok
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (SemanticDocument, Id, Id, Id) {
        let mut doc = SemanticDocument::new("model");
        let root = doc.root();
        let package = doc
            .create(root, ElementKind::Package, Some("Billing"))
            .unwrap();
        let use_case = doc
            .create(package, ElementKind::UseCase, Some("Pay"))
            .unwrap();
        let actor = doc
            .create(root, ElementKind::Actor, Some("Customer"))
            .unwrap();
        (doc, package, use_case, actor)
    }

    #[test]
    fn test_create_generates_nested_paths() {
        let (doc, package, use_case, actor) = sample();

        assert_eq!(package, "model::package_1");
        assert_eq!(use_case, "model::package_1::use_case_2");
        assert_eq!(actor, "model::actor_3");
        assert_eq!(doc.counter(), 3);
        assert!(doc.containment_is_consistent());
    }

    #[test]
    fn test_resolve_not_found() {
        let (doc, ..) = sample();
        let missing = Id::new("model::package_99");

        assert_eq!(doc.resolve(missing), Err(ModelError::NotFound(missing)));
    }

    #[test]
    fn test_resolve_kind_mismatch() {
        let (doc, package, ..) = sample();

        let err = doc.resolve_kind(package, ElementKind::Actor).unwrap_err();
        assert!(matches!(
            err,
            ModelError::TypeMismatch {
                found: ElementKind::Package,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_parent_rejected() {
        let (mut doc, _, use_case, _) = sample();
        let before = doc.clone();

        let err = doc
            .create(use_case, ElementKind::Actor, None)
            .unwrap_err();

        assert!(matches!(err, ModelError::InvalidParent { .. }));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_detach_and_reinsert_roundtrip() {
        let (mut doc, package, use_case, _) = sample();
        let before = doc.clone();

        let inverse = doc
            .apply(SemanticChange::DetachSubtree { path: package })
            .unwrap();
        assert!(!doc.contains(package));
        assert!(!doc.contains(use_case));
        assert!(doc.containment_is_consistent());

        doc.apply(inverse).unwrap();
        assert_eq!(doc, before);
    }

    #[test]
    fn test_root_cannot_be_detached() {
        let (mut doc, ..) = sample();
        let root = doc.root();

        assert_eq!(
            doc.apply(SemanticChange::DetachSubtree { path: root }),
            Err(ModelError::RootImmutable(root))
        );
    }

    #[test]
    fn test_walk_is_pre_order() {
        let (doc, package, use_case, actor) = sample();
        let order: Vec<Id> = doc.walk().into_iter().map(SemanticNode::path).collect();

        assert_eq!(order, vec![package, use_case, actor]);
    }

    #[test]
    fn test_relationships_and_annotations() {
        let (mut doc, package, use_case, actor) = sample();
        let root = doc.root();
        let association = doc
            .create_relationship(package, ElementKind::Association, actor, use_case)
            .unwrap();
        let comment = doc.create(root, ElementKind::Comment, Some("note")).unwrap();
        doc.annotate(comment, use_case).unwrap();

        let relationships: Vec<Id> = doc
            .relationships_of(use_case)
            .into_iter()
            .map(SemanticNode::path)
            .collect();
        assert_eq!(relationships, vec![association]);

        let annotations: Vec<Id> = doc
            .annotations_of(use_case)
            .into_iter()
            .map(SemanticNode::path)
            .collect();
        assert_eq!(annotations, vec![comment]);
    }

    #[test]
    fn test_set_name_inverse() {
        let (mut doc, _, _, actor) = sample();

        let inverse = doc
            .apply(SemanticChange::SetName {
                path: actor,
                name: Some("Clerk".to_string()),
            })
            .unwrap();
        assert_eq!(doc.resolve(actor).unwrap().name(), Some("Clerk"));

        doc.apply(inverse).unwrap();
        assert_eq!(doc.resolve(actor).unwrap().name(), Some("Customer"));
    }
}
