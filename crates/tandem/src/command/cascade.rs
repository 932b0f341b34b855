//! Cascading removal planning.
//!
//! Removing an element must take out everything that would otherwise be left
//! pointing at it, in a fixed order:
//!
//! 1. comment connectors terminating on the element or any descendant, and
//!    relationships that reference the subtree from outside it;
//! 2. each contained child, recursively, through the same procedure;
//! 3. the element's semantic node;
//! 4. the element's own notation record.
//!
//! The plan is computed from the documents as they are before the command
//! runs. One planner can plan several removals into the same command; it keeps
//! track of what is already scheduled so nothing is removed twice.

use std::collections::HashSet;

use log::{debug, trace};

use tandem_core::{
    identifier::Id,
    notation::{DocumentPair, connector_key},
    semantic::{Category, ElementKind, SemanticNode},
};

use crate::{
    command::compound::{CompoundCommand, NotationStep, RemovalStats, SemanticStep},
    error::Result,
};

pub(crate) struct CascadePlanner<'a> {
    pair: &'a DocumentPair,
    command: CompoundCommand,
    removed_nodes: HashSet<Id>,
    removed_records: HashSet<Id>,
    stats: RemovalStats,
}

impl<'a> CascadePlanner<'a> {
    pub(crate) fn new(pair: &'a DocumentPair, label: impl Into<String>) -> Self {
        Self {
            pair,
            command: CompoundCommand::new(label),
            removed_nodes: HashSet::new(),
            removed_records: HashSet::new(),
            stats: RemovalStats::default(),
        }
    }

    /// Plan the removal of `target` and everything depending on it.
    pub(crate) fn remove(&mut self, target: Id) -> Result<()> {
        let pair = self.pair;
        let node = pair.semantic.resolve(target)?;
        if self.removed_nodes.contains(&target) {
            trace!(path:% = target; "Already scheduled for removal");
            return Ok(());
        }
        debug!(path:% = target, kind:% = node.kind(); "Planning cascading removal");

        self.remove_incoming(target);
        self.remove_node(node);
        Ok(())
    }

    /// Plan the removal of the connector from `comment` to `target`.
    pub(crate) fn remove_comment_edge(&mut self, comment: Id, target: Id) {
        let key = connector_key(comment, target);
        if !self.removed_records.insert(key) {
            return;
        }
        let annotated = self
            .pair
            .semantic
            .get(comment)
            .is_some_and(|node| node.annotated().contains(&target));
        if annotated && !self.removed_nodes.contains(&comment) {
            self.command
                .push_semantic(SemanticStep::Unannotate { comment, target });
        }
        if self.pair.notation.get(key).is_some() {
            self.command.push_notation(NotationStep::RemoveRecord { key });
            self.stats.connectors += 1;
        }
    }

    pub(crate) fn finish(mut self) -> CompoundCommand {
        debug!(stats:? = self.stats; "Cascading removal planned");
        self.command.set_removal(self.stats);
        self.command
    }

    /// Connectors and relationships that reach into the subtree at `target`
    /// from outside it.
    fn remove_incoming(&mut self, target: Id) {
        let pair = self.pair;
        let semantic = &pair.semantic;
        let mut edges = Vec::new();
        let mut relationships = Vec::new();
        for node in semantic.walk() {
            if node.path().is_within(target) {
                continue;
            }
            if node.kind() == ElementKind::Comment {
                edges.extend(
                    node.annotated()
                        .iter()
                        .filter(|annotated| annotated.is_within(target))
                        .map(|annotated| (node.path(), *annotated)),
                );
            }
            if node.ends().is_some_and(|ends| ends.touches(target)) {
                relationships.push(node.path());
            }
        }
        // Connector records without a matching annotation are removed too.
        for record in pair.notation.connectors_into(target) {
            let Some(connector_target) = record.connector_target() else {
                continue;
            };
            let edge = (record.proxy(), connector_target);
            if !record.proxy().is_within(target) && !edges.contains(&edge) {
                edges.push(edge);
            }
        }

        for (comment, annotated) in edges {
            self.remove_comment_edge(comment, annotated);
        }
        for relationship in relationships {
            self.remove_relationship(relationship);
        }
    }

    fn remove_relationship(&mut self, path: Id) {
        if !self.removed_nodes.insert(path) {
            return;
        }
        self.remove_record(path);
        self.command.push_semantic(SemanticStep::Detach { path });
        self.stats.relationships += 1;
    }

    fn remove_node(&mut self, node: &SemanticNode) {
        let pair = self.pair;
        let path = node.path();
        if self.removed_nodes.contains(&path) {
            return;
        }

        for child in pair.semantic.children(path) {
            if child.kind().is_relationship() {
                // Leaves with the owner; only the edge record goes first.
                if self.removed_nodes.insert(child.path()) {
                    self.remove_record(child.path());
                    self.stats.relationships += 1;
                }
            } else {
                self.remove_node(child);
            }
        }

        if node.kind() == ElementKind::Comment {
            let outgoing: Vec<Id> = pair
                .notation
                .records_for(path)
                .filter_map(|record| record.connector_target())
                .collect();
            for target in outgoing {
                let key = connector_key(path, target);
                if self.removed_records.insert(key) {
                    self.command.push_notation(NotationStep::RemoveRecord { key });
                    self.stats.connectors += 1;
                }
            }
        }

        self.removed_nodes.insert(path);
        self.command.push_semantic(SemanticStep::Detach { path });
        self.remove_record(path);

        match node.kind() {
            kind if kind.is_container() => self.stats.containers += 1,
            kind if kind.is_relationship() => self.stats.relationships += 1,
            kind if kind.category() == Category::Feature => self.stats.features += 1,
            _ => self.stats.leaves += 1,
        }
    }

    fn remove_record(&mut self, key: Id) {
        if self.pair.notation.get(key).is_some() && self.removed_records.insert(key) {
            self.command.push_notation(NotationStep::RemoveRecord { key });
        }
    }
}
