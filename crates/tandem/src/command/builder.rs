//! Turns client operations into compound commands.
//!
//! Every path an operation names is resolved and type-checked here, before
//! the first write, so that bad requests are rejected without ever touching
//! the documents.

use log::{debug, trace};

use tandem_core::{
    error::ModelError,
    geometry::{Point, Size},
    identifier::Id,
    notation::{DocumentPair, NotationRecord, connector_key, is_connector_key},
    semantic::{ElementKind, RelationshipEnds},
};

use crate::{
    command::{
        Operation,
        cascade::CascadePlanner,
        compound::{CompoundCommand, NotationStep, ProxyRef, ResultSlot, SemanticStep},
    },
    error::{Result, TandemError},
    render::{CHILDREN_SEGMENT, HEADER_SEGMENT, LABEL_SEGMENT},
};

/// Builds compound commands against a fixed state of a document pair.
pub struct CommandBuilder<'a> {
    pair: &'a DocumentPair,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(pair: &'a DocumentPair) -> Self {
        Self { pair }
    }

    /// Build the compound command for `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotFound`] or [`ModelError::TypeMismatch`] for
    /// paths that do not resolve or resolve to the wrong kind of element, and
    /// [`TandemError::InvalidOperation`] for requests that can never succeed.
    pub fn build(&self, operation: &Operation) -> Result<CompoundCommand> {
        let label = operation.label();
        trace!(operation:?; "Building command");
        match operation {
            Operation::AddElement {
                kind,
                position,
                parent,
                name,
            } => self.add_element(label, *kind, *position, *parent, name.as_deref()),
            Operation::AddRelationship {
                kind,
                source,
                target,
                name,
            } => self.add_relationship(label, *kind, *source, *target, name.as_deref()),
            Operation::AddCommentEdge { comment, target } => {
                self.add_comment_edge(label, *comment, *target)
            }
            Operation::Remove { target, expected } => self.remove(label, *target, *expected),
            Operation::Delete { element_ids } => self.delete(label, element_ids),
            Operation::RemoveCommentEdge { comment, target } => {
                self.remove_comment_edge(label, *comment, *target)
            }
            Operation::SetName {
                target,
                expected,
                name,
            } => self.set_name(label, *target, *expected, name.as_deref()),
            Operation::ChangeBounds {
                target,
                position,
                size,
            } => self.change_bounds(label, *target, *position, *size),
            Operation::Reroute { target, routing } => self.reroute(label, *target, routing),
        }
    }

    fn add_element(
        &self,
        label: String,
        kind: ElementKind,
        position: Point,
        parent: Option<Id>,
        name: Option<&str>,
    ) -> Result<CompoundCommand> {
        if kind.is_relationship() || kind == ElementKind::Model {
            return Err(TandemError::InvalidOperation(format!(
                "{kind} elements cannot be added as standalone elements"
            )));
        }
        let owner = parent.unwrap_or(self.pair.semantic.root());
        let owner_node = self.pair.semantic.resolve(owner)?;
        if !owner_node.kind().can_own(kind) {
            return Err(ModelError::InvalidParent {
                parent: owner,
                kind,
            }
            .into());
        }

        let slot = ResultSlot::new();
        let mut command = CompoundCommand::new(label);
        command.push_semantic(SemanticStep::Create {
            owner,
            kind,
            name: name.map(str::to_string),
            ends: None,
            slot: slot.clone(),
        });
        if kind.has_notation() {
            let relative = position.sub_point(self.pair.absolute_origin(owner));
            debug!(owner:%, absolute:? = position, relative:?; "Placing new shape");
            command.push_notation(NotationStep::CreateShape {
                proxy: ProxyRef::Slot(slot.clone()),
                position: relative,
                size: None,
            });
        }
        command.set_created(slot);
        Ok(command)
    }

    fn add_relationship(
        &self,
        label: String,
        kind: ElementKind,
        source: Id,
        target: Id,
        name: Option<&str>,
    ) -> Result<CompoundCommand> {
        let semantic = &self.pair.semantic;
        let owner = match kind {
            ElementKind::Include | ElementKind::Extend => {
                semantic.resolve_kind(source, ElementKind::UseCase)?;
                semantic.resolve_kind(target, ElementKind::UseCase)?;
                source
            }
            ElementKind::Generalization => {
                semantic.resolve_where(source, "classifier", ElementKind::is_classifier)?;
                semantic.resolve_where(target, "classifier", ElementKind::is_classifier)?;
                source
            }
            ElementKind::Association => {
                let source_node =
                    semantic.resolve_where(source, "classifier", ElementKind::is_classifier)?;
                semantic.resolve_where(target, "classifier", ElementKind::is_classifier)?;
                source_node.owner().unwrap_or(semantic.root())
            }
            _ => {
                return Err(TandemError::InvalidOperation(format!(
                    "{kind} is not a relationship kind"
                )));
            }
        };

        let slot = ResultSlot::new();
        let mut command = CompoundCommand::new(label);
        command.push_semantic(SemanticStep::Create {
            owner,
            kind,
            name: name.map(str::to_string),
            ends: Some(RelationshipEnds::new(source, target)),
            slot: slot.clone(),
        });
        command.push_notation(NotationStep::CreateEdge {
            proxy: ProxyRef::Slot(slot.clone()),
            routing: Vec::new(),
        });
        command.set_created(slot);
        Ok(command)
    }

    fn add_comment_edge(&self, label: String, comment: Id, target: Id) -> Result<CompoundCommand> {
        let semantic = &self.pair.semantic;
        semantic.resolve_kind(comment, ElementKind::Comment)?;
        let target_node = semantic.resolve(target)?;
        if target_node.owner().is_none() {
            return Err(ModelError::RootImmutable(target).into());
        }
        if self.pair.notation.connector(comment, target).is_some() {
            return Err(ModelError::DuplicateRecord(connector_key(comment, target)).into());
        }

        let mut command = CompoundCommand::new(label);
        command.push_semantic(SemanticStep::Annotate { comment, target });
        command.push_notation(NotationStep::CreateConnector { comment, target });
        Ok(command)
    }

    fn remove(
        &self,
        label: String,
        target: Id,
        expected: Option<ElementKind>,
    ) -> Result<CompoundCommand> {
        let node = match expected {
            Some(kind) => self.pair.semantic.resolve_kind(target, kind)?,
            None => self.pair.semantic.resolve(target)?,
        };
        if node.owner().is_none() {
            return Err(ModelError::RootImmutable(target).into());
        }

        let mut planner = CascadePlanner::new(self.pair, label);
        planner.remove(target)?;
        Ok(planner.finish())
    }

    /// Remove everything behind a selection of render node ids.
    ///
    /// Connector ids remove the comment edge they stand for. Any other id is
    /// mapped to the semantic node it was derived from; ids nested under
    /// another selected element are covered by that element's removal.
    fn delete(&self, label: String, element_ids: &[Id]) -> Result<CompoundCommand> {
        let mut edges = Vec::new();
        let mut targets: Vec<Id> = Vec::new();
        for id in element_ids {
            if is_connector_key(*id) {
                let record = self
                    .pair
                    .notation
                    .get(*id)
                    .ok_or(ModelError::RecordNotFound(*id))?;
                let target = record
                    .connector_target()
                    .ok_or(ModelError::GeometryMismatch {
                        key: *id,
                        expected: "connector",
                    })?;
                edges.push((record.proxy(), target));
            } else {
                let path = self.semantic_origin(*id)?;
                if !targets.contains(&path) {
                    targets.push(path);
                }
            }
        }

        let selected = targets.clone();
        targets.retain(|path| {
            !selected
                .iter()
                .any(|other| other != path && path.is_within(*other))
        });
        debug!(edges = edges.len(), elements = targets.len(); "Planning delete");

        let mut planner = CascadePlanner::new(self.pair, label);
        for (comment, target) in edges {
            planner.remove_comment_edge(comment, target);
        }
        for target in targets {
            planner.remove(target)?;
        }
        Ok(planner.finish())
    }

    /// Semantic node a render id was derived from: the id itself, or the
    /// element owning a header, compartment or label part.
    fn semantic_origin(&self, id: Id) -> Result<Id> {
        let semantic = &self.pair.semantic;
        let path = if semantic.get(id).is_some() {
            id
        } else {
            let segment = id.last_segment();
            let part = [HEADER_SEGMENT, CHILDREN_SEGMENT, LABEL_SEGMENT].contains(&segment.as_str());
            match id.parent() {
                Some(parent) if part && semantic.get(parent).is_some() => parent,
                _ => return Err(ModelError::NotFound(id).into()),
            }
        };
        trace!(id:% = id, path:% = path; "Resolved render id");

        match semantic.get(path) {
            Some(node) if node.owner().is_none() => Err(ModelError::RootImmutable(path).into()),
            Some(_) => Ok(path),
            None => Err(ModelError::NotFound(id).into()),
        }
    }

    fn remove_comment_edge(
        &self,
        label: String,
        comment: Id,
        target: Id,
    ) -> Result<CompoundCommand> {
        let comment_node = self
            .pair
            .semantic
            .resolve_kind(comment, ElementKind::Comment)?;
        let key = connector_key(comment, target);
        if self.pair.notation.get(key).is_none() && !comment_node.annotated().contains(&target) {
            return Err(ModelError::RecordNotFound(key).into());
        }

        let mut planner = CascadePlanner::new(self.pair, label);
        planner.remove_comment_edge(comment, target);
        Ok(planner.finish())
    }

    fn set_name(
        &self,
        label: String,
        target: Id,
        expected: ElementKind,
        name: Option<&str>,
    ) -> Result<CompoundCommand> {
        self.pair.semantic.resolve_kind(target, expected)?;
        let mut command = CompoundCommand::new(label);
        command.push_semantic(SemanticStep::Rename {
            path: target,
            name: name.map(str::to_string),
        });
        Ok(command)
    }

    fn change_bounds(
        &self,
        label: String,
        target: Id,
        position: Option<Point>,
        size: Option<Size>,
    ) -> Result<CompoundCommand> {
        self.pair.semantic.resolve(target)?;
        let (current_position, current_size) = self
            .pair
            .notation
            .shape_for(target)
            .and_then(NotationRecord::bounds)
            .ok_or(ModelError::RecordNotFound(target))?;

        let mut command = CompoundCommand::new(label);
        command.push_notation(NotationStep::SetBounds {
            key: target,
            position: position.unwrap_or(current_position),
            size: size.or(current_size),
        });
        Ok(command)
    }

    fn reroute(&self, label: String, target: Id, routing: &[Point]) -> Result<CompoundCommand> {
        let record = self
            .pair
            .notation
            .get(target)
            .ok_or(ModelError::RecordNotFound(target))?;
        if record.routing().is_none() {
            return Err(ModelError::GeometryMismatch {
                key: target,
                expected: "edge",
            }
            .into());
        }

        let mut command = CompoundCommand::new(label);
        command.push_notation(NotationStep::SetRouting {
            key: target,
            routing: routing.to_vec(),
        });
        Ok(command)
    }
}
