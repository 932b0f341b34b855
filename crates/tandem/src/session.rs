//! Diagram sessions.
//!
//! A [`DiagramSession`] owns one document pair together with its current
//! render tree. Every public operation takes the session lock for its whole
//! request/response cycle, so no caller can observe an intermediate state.
//! Sessions for different URIs are independent and proceed in parallel.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use log::{debug, info, warn};

use tandem_core::{identifier::Id, notation::DocumentPair};

use crate::{
    adjust::{ElementBounds, adjust},
    command::{self, Journal, Operation, RemovalStats},
    config::{AppConfig, SessionConfig},
    derive::{DiagramKind, derive},
    error::{Result, TandemError},
    render::RenderTree,
    store::ModelStore,
};

/// The render tree a session currently serves, with what produced it.
#[derive(Debug, Clone)]
pub struct Snapshot {
    tree: RenderTree,
    removal: RemovalStats,
    created: Option<Id>,
}

impl Snapshot {
    pub fn revision(&self) -> u64 {
        self.tree.revision()
    }

    pub fn tree(&self) -> &RenderTree {
        &self.tree
    }

    pub fn into_tree(self) -> RenderTree {
        self.tree
    }

    /// What the command behind this snapshot removed; empty otherwise.
    pub fn removal(&self) -> RemovalStats {
        self.removal
    }

    /// Path of the element the command behind this snapshot created.
    pub fn created(&self) -> Option<Id> {
        self.created
    }
}

#[derive(Debug)]
struct SessionState {
    pair: DocumentPair,
    revision: u64,
    derived: RenderTree,
    adjusted: Option<RenderTree>,
    undo: VecDeque<Journal>,
    redo: Vec<Journal>,
}

impl SessionState {
    fn current(&self) -> &RenderTree {
        self.adjusted.as_ref().unwrap_or(&self.derived)
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            tree: self.current().clone(),
            removal: RemovalStats::default(),
            created: None,
        }
    }
}

/// One open diagram.
#[derive(Debug)]
pub struct DiagramSession {
    uri: String,
    kind: DiagramKind,
    config: AppConfig,
    state: Mutex<SessionState>,
}

impl DiagramSession {
    /// Open a session over `pair` and derive its first render tree at
    /// revision 0.
    pub fn new(
        uri: impl Into<String>,
        kind: DiagramKind,
        pair: DocumentPair,
        config: AppConfig,
    ) -> Result<Self> {
        let derived = derive(kind, &pair, 0)?;
        Ok(Self {
            uri: uri.into(),
            kind,
            config,
            state: Mutex::new(SessionState {
                pair,
                revision: 0,
                derived,
                adjusted: None,
                undo: VecDeque::new(),
                redo: Vec::new(),
            }),
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn kind(&self) -> DiagramKind {
        self.kind
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionState>> {
        self.state.lock().map_err(|_| TandemError::SessionPoisoned)
    }

    fn session_config(&self) -> &SessionConfig {
        self.config.session()
    }

    /// Execute `operation` and derive the resulting render tree.
    ///
    /// On any failure, including a failing derivation, both documents are
    /// left as they were and the revision does not move.
    pub fn execute(&self, operation: &Operation) -> Result<Snapshot> {
        let mut state = self.lock()?;
        let applied = command::execute(&mut state.pair, operation)?;

        if self.session_config().verify_consistency() {
            let dangling = state.pair.dangling_proxies();
            if !dangling.is_empty() {
                warn!(uri = self.uri.as_str(), dangling:?; "Command left dangling records");
                applied.journal.revert(&mut state.pair)?;
                return Err(TandemError::Inconsistent {
                    command: operation.label(),
                    dangling,
                });
            }
        }

        let revision = state.revision + 1;
        let derived = match derive(self.kind, &state.pair, revision) {
            Ok(tree) => tree,
            Err(err) => {
                applied.journal.revert(&mut state.pair)?;
                return Err(err);
            }
        };

        state.revision = revision;
        state.derived = derived;
        state.adjusted = None;
        state.redo.clear();
        self.push_undo(&mut state, applied.journal);
        info!(uri = self.uri.as_str(), revision; "Command applied");

        Ok(Snapshot {
            tree: state.derived.clone(),
            removal: applied.removal,
            created: applied.created,
        })
    }

    fn push_undo(&self, state: &mut SessionState, journal: Journal) {
        let limit = self.session_config().undo_limit();
        if limit == 0 {
            return;
        }
        state.undo.push_back(journal);
        while state.undo.len() > limit {
            state.undo.pop_front();
        }
    }

    /// Re-derive the render tree from the current documents.
    pub fn derive(&self) -> Result<Snapshot> {
        let mut state = self.lock()?;
        state.derived = derive(self.kind, &state.pair, state.revision)?;
        state.adjusted = None;
        Ok(state.snapshot())
    }

    /// Apply bounds measured by the client against `revision`.
    ///
    /// Returns `Ok(None)` without changing anything if `revision` is not the
    /// current one. The adjustment always starts from the derived tree, so
    /// submitting the same bounds twice gives the same result.
    pub fn apply_measured_bounds(
        &self,
        revision: u64,
        bounds: &[ElementBounds],
    ) -> Result<Option<Snapshot>> {
        let mut state = self.lock()?;
        if revision != state.revision {
            debug!(uri = self.uri.as_str(), revision, current = state.revision; "Ignoring stale measured bounds");
            return Ok(None);
        }
        let mut tree = state.derived.clone();
        adjust(&mut tree, bounds, self.config.layout());
        state.adjusted = Some(tree);
        Ok(Some(state.snapshot()))
    }

    /// Revert the most recent command. Returns `Ok(None)` if there is nothing
    /// to undo.
    pub fn undo(&self) -> Result<Option<Snapshot>> {
        let mut state = self.lock()?;
        let Some(journal) = state.undo.pop_back() else {
            return Ok(None);
        };
        let label = journal.label().to_string();
        let redo = journal.revert(&mut state.pair)?;
        let revision = state.revision + 1;
        let derived = match derive(self.kind, &state.pair, revision) {
            Ok(tree) => tree,
            Err(err) => {
                let undo = redo.revert(&mut state.pair)?;
                state.undo.push_back(undo);
                return Err(err);
            }
        };
        state.revision = revision;
        state.derived = derived;
        state.adjusted = None;
        state.redo.push(redo);
        info!(uri = self.uri.as_str(), command = label.as_str(), revision; "Undone");
        Ok(Some(state.snapshot()))
    }

    /// Re-apply the most recently undone command. Returns `Ok(None)` if
    /// there is nothing to redo.
    pub fn redo(&self) -> Result<Option<Snapshot>> {
        let mut state = self.lock()?;
        let Some(journal) = state.redo.pop() else {
            return Ok(None);
        };
        let label = journal.label().to_string();
        let undo = journal.revert(&mut state.pair)?;
        let revision = state.revision + 1;
        let derived = match derive(self.kind, &state.pair, revision) {
            Ok(tree) => tree,
            Err(err) => {
                let redo = undo.revert(&mut state.pair)?;
                state.redo.push(redo);
                return Err(err);
            }
        };
        state.revision = revision;
        state.derived = derived;
        state.adjusted = None;
        self.push_undo(&mut state, undo);
        info!(uri = self.uri.as_str(), command = label.as_str(), revision; "Redone");
        Ok(Some(state.snapshot()))
    }

    /// The render tree currently served: the adjusted tree if bounds were
    /// applied at this revision, the derived tree otherwise.
    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(self.lock()?.snapshot())
    }

    /// Current revision.
    pub fn revision(&self) -> Result<u64> {
        Ok(self.lock()?.revision)
    }

    /// Run `f` with read access to the documents.
    pub fn with_documents<R>(&self, f: impl FnOnce(&DocumentPair) -> R) -> Result<R> {
        let state = self.lock()?;
        Ok(f(&state.pair))
    }

    pub fn can_undo(&self) -> Result<bool> {
        Ok(!self.lock()?.undo.is_empty())
    }

    pub fn can_redo(&self) -> Result<bool> {
        Ok(!self.lock()?.redo.is_empty())
    }
}

/// Open sessions keyed by URI.
pub struct SessionRegistry {
    store: Arc<dyn ModelStore>,
    config: AppConfig,
    sessions: Mutex<HashMap<String, Arc<DiagramSession>>>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn ModelStore>, config: AppConfig) -> Self {
        Self {
            store,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sessions(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<DiagramSession>>>> {
        self.sessions
            .lock()
            .map_err(|_| TandemError::SessionPoisoned)
    }

    /// Return the session for `uri`, loading the model from the store if it
    /// is not open yet.
    pub fn open(&self, uri: &str, kind: DiagramKind) -> Result<Arc<DiagramSession>> {
        let mut sessions = self.sessions()?;
        if let Some(session) = sessions.get(uri) {
            if session.kind() != kind {
                return Err(TandemError::InvalidOperation(format!(
                    "`{uri}` is already open as a {:?} diagram, not {kind:?}",
                    session.kind()
                )));
            }
            return Ok(Arc::clone(session));
        }
        info!(uri, diagram_kind:? = kind; "Opening session");
        let pair = self.store.load(uri)?;
        let session = Arc::new(DiagramSession::new(uri, kind, pair, self.config.clone())?);
        sessions.insert(uri.to_string(), Arc::clone(&session));
        Ok(session)
    }

    pub fn get(&self, uri: &str) -> Result<Option<Arc<DiagramSession>>> {
        Ok(self.sessions()?.get(uri).cloned())
    }

    /// Save the session's documents and drop it. Returns `false` if no
    /// session was open for `uri`. A failed save keeps the session open.
    pub fn close(&self, uri: &str) -> Result<bool> {
        let mut sessions = self.sessions()?;
        let Some(session) = sessions.get(uri) else {
            return Ok(false);
        };
        info!(uri; "Closing session");
        session.with_documents(|pair| self.store.save(uri, pair))??;
        sessions.remove(uri);
        Ok(true)
    }
}
