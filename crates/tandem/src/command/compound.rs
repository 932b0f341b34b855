//! Compound commands, their steps, and the journal used for rollback and
//! undo.

use std::{cell::OnceCell, fmt, rc::Rc};

use log::{debug, error, trace, warn};

use tandem_core::{
    geometry::{Point, Size},
    identifier::Id,
    notation::{DocumentPair, NotationChange, NotationRecord},
    semantic::{DetachedSubtree, ElementKind, RelationshipEnds, SemanticChange, SemanticNode},
};

use crate::error::{Result, TandemError};

/// Write-once cell carrying the path of a node created by one step to a later
/// step of the same compound command.
#[derive(Debug, Clone, Default)]
pub struct ResultSlot(Rc<OnceCell<Id>>);

impl ResultSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Id> {
        self.0.get().copied()
    }

    fn fill(&self, path: Id) -> Result<()> {
        self.0.set(path).map_err(|_| {
            TandemError::new_partial_application("result slot", "slot was filled twice")
        })
    }
}

/// Reference to the semantic node a notation step works on.
#[derive(Debug, Clone)]
pub enum ProxyRef {
    /// A node that existed when the command was built.
    Path(Id),
    /// A node created by an earlier step.
    Slot(ResultSlot),
}

impl ProxyRef {
    fn resolve(&self, command: &str) -> Result<Id> {
        match self {
            ProxyRef::Path(path) => Ok(*path),
            ProxyRef::Slot(slot) => slot.get().ok_or_else(|| {
                TandemError::new_partial_application(
                    command,
                    "a step depends on a result that was never produced",
                )
            }),
        }
    }
}

/// One atomic edit of the semantic document.
#[derive(Debug, Clone)]
pub enum SemanticStep {
    /// Create a node under `owner` and publish its path through `slot`.
    Create {
        owner: Id,
        kind: ElementKind,
        name: Option<String>,
        ends: Option<RelationshipEnds>,
        slot: ResultSlot,
    },
    /// Remove a node together with whatever it still owns.
    Detach { path: Id },
    Rename { path: Id, name: Option<String> },
    Annotate { comment: Id, target: Id },
    Unannotate { comment: Id, target: Id },
}

/// One atomic edit of the notation document.
#[derive(Debug, Clone)]
pub enum NotationStep {
    CreateShape {
        proxy: ProxyRef,
        position: Point,
        size: Option<Size>,
    },
    CreateEdge {
        proxy: ProxyRef,
        routing: Vec<Point>,
    },
    CreateConnector {
        comment: Id,
        target: Id,
    },
    RemoveRecord {
        key: Id,
    },
    SetBounds {
        key: Id,
        position: Point,
        size: Option<Size>,
    },
    SetRouting {
        key: Id,
        routing: Vec<Point>,
    },
}

/// One atomic edit; targets exactly one of the two documents.
#[derive(Debug, Clone)]
pub enum Command {
    Semantic(SemanticStep),
    Notation(NotationStep),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Semantic(SemanticStep::Create { owner, kind, .. }) => {
                write!(f, "create {kind} in `{owner}`")
            }
            Command::Semantic(SemanticStep::Detach { path }) => write!(f, "detach `{path}`"),
            Command::Semantic(SemanticStep::Rename { path, .. }) => write!(f, "rename `{path}`"),
            Command::Semantic(SemanticStep::Annotate { comment, target }) => {
                write!(f, "annotate `{target}` with `{comment}`")
            }
            Command::Semantic(SemanticStep::Unannotate { comment, target }) => {
                write!(f, "unannotate `{target}` from `{comment}`")
            }
            Command::Notation(NotationStep::CreateShape { .. }) => write!(f, "create shape"),
            Command::Notation(NotationStep::CreateEdge { .. }) => write!(f, "create edge"),
            Command::Notation(NotationStep::CreateConnector { comment, target }) => {
                write!(f, "create connector `{comment}` -> `{target}`")
            }
            Command::Notation(NotationStep::RemoveRecord { key }) => {
                write!(f, "remove record `{key}`")
            }
            Command::Notation(NotationStep::SetBounds { key, .. }) => {
                write!(f, "set bounds of `{key}`")
            }
            Command::Notation(NotationStep::SetRouting { key, .. }) => {
                write!(f, "set routing of `{key}`")
            }
        }
    }
}

/// A primitive change of either document.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Semantic(SemanticChange),
    Notation(NotationChange),
}

impl Change {
    /// Apply the change and return its inverse.
    fn apply(self, pair: &mut DocumentPair) -> Result<Change> {
        Ok(match self {
            Change::Semantic(change) => Change::Semantic(pair.semantic.apply(change)?),
            Change::Notation(change) => Change::Notation(pair.notation.apply(change)?),
        })
    }
}

/// Inverse changes recorded while a compound command ran, in the order the
/// forward changes were applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Journal {
    label: String,
    inverses: Vec<Change>,
}

impl Journal {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            inverses: Vec::new(),
        }
    }

    /// Label of the command that produced this journal.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.inverses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inverses.is_empty()
    }

    fn record(&mut self, pair: &mut DocumentPair, change: Change) -> Result<()> {
        let inverse = change.apply(pair)?;
        self.inverses.push(inverse);
        Ok(())
    }

    /// Undo everything this journal recorded and return the journal that
    /// redoes it.
    ///
    /// If an inverse fails to apply, the changes reverted so far are
    /// re-applied and the error is returned, leaving the documents as they
    /// were before the call.
    pub fn revert(self, pair: &mut DocumentPair) -> Result<Journal> {
        let mut redo = Journal::new(self.label.clone());
        for change in self.inverses.into_iter().rev() {
            if let Err(err) = redo.record(pair, change) {
                error!(command = redo.label.as_str(), err:%; "Failed to revert journal");
                redo.rollback(pair);
                return Err(err);
            }
        }
        Ok(redo)
    }

    /// Revert a partially executed command. Failures are logged; nothing can
    /// be done about them at this point.
    pub(crate) fn rollback(self, pair: &mut DocumentPair) {
        debug!(command = self.label.as_str(), changes = self.inverses.len(); "Rolling back");
        for change in self.inverses.into_iter().rev() {
            if let Err(err) = change.apply(pair) {
                error!(err:%; "Rollback step failed");
            }
        }
    }
}

/// Counts of what a cascading removal took out of the documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalStats {
    pub containers: usize,
    pub leaves: usize,
    /// Features such as extension points and properties; they have no records.
    pub features: usize,
    pub connectors: usize,
    pub relationships: usize,
}

impl RemovalStats {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of a successfully executed compound command.
#[derive(Debug, Clone)]
pub struct Applied {
    pub journal: Journal,
    pub removal: RemovalStats,
    /// Path of the node created by the command, if any.
    pub created: Option<Id>,
}

/// An ordered list of atomic edits executed as one all-or-nothing
/// transaction across both documents.
#[derive(Debug, Clone)]
pub struct CompoundCommand {
    label: String,
    steps: Vec<Command>,
    removal: RemovalStats,
    created: Option<ResultSlot>,
}

impl CompoundCommand {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            steps: Vec::new(),
            removal: RemovalStats::default(),
            created: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn steps(&self) -> &[Command] {
        &self.steps
    }

    pub fn push(&mut self, step: Command) {
        self.steps.push(step);
    }

    pub fn push_semantic(&mut self, step: SemanticStep) {
        self.steps.push(Command::Semantic(step));
    }

    pub fn push_notation(&mut self, step: NotationStep) {
        self.steps.push(Command::Notation(step));
    }

    pub(crate) fn set_removal(&mut self, removal: RemovalStats) {
        self.removal = removal;
    }

    /// Mark `slot` as carrying the path of the element this command creates.
    pub(crate) fn set_created(&mut self, slot: ResultSlot) {
        self.created = Some(slot);
    }

    /// Execute every step in order.
    ///
    /// # Errors
    ///
    /// If any step fails, every change applied so far is reverted and the
    /// step's error is returned; both documents are left exactly as they were.
    pub fn execute(self, pair: &mut DocumentPair) -> Result<Applied> {
        debug!(command = self.label.as_str(), steps = self.steps.len(); "Executing compound command");
        let mut journal = Journal::new(self.label.clone());
        for step in &self.steps {
            trace!(step:%; "Running step");
            if let Err(err) = run_step(&self.label, step, pair, &mut journal) {
                warn!(command = self.label.as_str(), step:%, err:%; "Step failed, aborting command");
                journal.rollback(pair);
                return Err(err);
            }
        }
        Ok(Applied {
            journal,
            removal: self.removal,
            created: self.created.as_ref().and_then(ResultSlot::get),
        })
    }
}

fn run_step(
    label: &str,
    step: &Command,
    pair: &mut DocumentPair,
    journal: &mut Journal,
) -> Result<()> {
    match step {
        Command::Semantic(step) => run_semantic(step, pair, journal),
        Command::Notation(step) => run_notation(label, step, pair, journal),
    }
}

fn run_semantic(step: &SemanticStep, pair: &mut DocumentPair, journal: &mut Journal) -> Result<()> {
    match step {
        SemanticStep::Create {
            owner,
            kind,
            name,
            ends,
            slot,
        } => {
            let (path, counter) = pair.semantic.next_path(*owner, *kind);
            let mut node = SemanticNode::new(path, *kind).with_name(name.clone());
            if let Some(ends) = ends {
                node = node.with_ends(*ends);
            }
            let index = pair.semantic.resolve(*owner)?.children().len();
            journal.record(
                pair,
                Change::Semantic(SemanticChange::InsertSubtree {
                    owner: *owner,
                    index,
                    subtree: DetachedSubtree::single(node),
                }),
            )?;
            journal.record(
                pair,
                Change::Semantic(SemanticChange::SetCounter { value: counter }),
            )?;
            slot.fill(path)
        }
        SemanticStep::Detach { path } => journal.record(
            pair,
            Change::Semantic(SemanticChange::DetachSubtree { path: *path }),
        ),
        SemanticStep::Rename { path, name } => journal.record(
            pair,
            Change::Semantic(SemanticChange::SetName {
                path: *path,
                name: name.clone(),
            }),
        ),
        SemanticStep::Annotate { comment, target } => {
            let mut annotated = pair.semantic.resolve(*comment)?.annotated().to_vec();
            if !annotated.contains(target) {
                annotated.push(*target);
            }
            journal.record(
                pair,
                Change::Semantic(SemanticChange::SetAnnotated {
                    path: *comment,
                    annotated,
                }),
            )
        }
        SemanticStep::Unannotate { comment, target } => {
            let mut annotated = pair.semantic.resolve(*comment)?.annotated().to_vec();
            annotated.retain(|path| path != target);
            journal.record(
                pair,
                Change::Semantic(SemanticChange::SetAnnotated {
                    path: *comment,
                    annotated,
                }),
            )
        }
    }
}

fn run_notation(
    label: &str,
    step: &NotationStep,
    pair: &mut DocumentPair,
    journal: &mut Journal,
) -> Result<()> {
    let change = match step {
        NotationStep::CreateShape {
            proxy,
            position,
            size,
        } => NotationChange::InsertRecord {
            index: pair.notation.len(),
            record: NotationRecord::shape(proxy.resolve(label)?, *position, *size),
        },
        NotationStep::CreateEdge { proxy, routing } => NotationChange::InsertRecord {
            index: pair.notation.len(),
            record: NotationRecord::edge(proxy.resolve(label)?, routing.clone()),
        },
        NotationStep::CreateConnector { comment, target } => NotationChange::InsertRecord {
            index: pair.notation.len(),
            record: NotationRecord::connector(*comment, *target),
        },
        NotationStep::RemoveRecord { key } => NotationChange::RemoveRecord { key: *key },
        NotationStep::SetBounds {
            key,
            position,
            size,
        } => NotationChange::SetBounds {
            key: *key,
            position: *position,
            size: *size,
        },
        NotationStep::SetRouting { key, routing } => NotationChange::SetRouting {
            key: *key,
            routing: routing.clone(),
        },
    };
    journal.record(pair, Change::Notation(change))
}
