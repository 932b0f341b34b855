//! CLI logic for the Tandem diagram engine.
//!
//! The CLI stands in for an editor client: it opens a diagram session,
//! replays the steps of an edit script against it and writes the render tree
//! the session ends up serving.
//!
//! A script is a TOML file:
//!
//! ```toml
//! uri = "mem://shop.uml"
//! diagram = "use_case"
//!
//! [[steps]]
//! op = "add_element"
//! kind = "package"
//! position = { x = 0.0, y = 0.0 }
//!
//! [[steps]]
//! op = "measure"
//! bounds = [{ id = "shop::package_1", size = { width = 120.0, height = 80.0 } }]
//!
//! [[steps]]
//! op = "undo"
//! ```
//!
//! Any `op` other than `measure`, `undo` and `redo` is an edit operation.

pub mod error_adapter;

mod args;
mod config;
mod script;

pub use args::Args;
pub use script::{Script, ScriptError, Step};

use std::{fs, io, sync::Arc};

use log::{error, info, warn};

use tandem::{
    TandemError,
    session::{DiagramSession, SessionRegistry, Snapshot},
    store::MemoryStore,
};

/// Run the Tandem CLI application
///
/// This function replays the script's steps against a fresh in-memory
/// session and writes the final render tree to the output file.
///
/// # Errors
///
/// Returns `TandemError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Malformed scripts
/// - The first step the engine rejects
pub fn run(args: &Args) -> Result<(), TandemError> {
    info!(
        script_path = args.script,
        output_path = args.output;
        "Replaying edit script"
    );

    let app_config = config::load_config(args.config.as_ref())?;

    let source = fs::read_to_string(&args.script)?;
    let script = Script::parse(&source)?;

    let registry = SessionRegistry::new(Arc::new(MemoryStore::new()), app_config);
    let session = registry.open(script.uri(), script.diagram())?;

    let mut snapshot = session.snapshot()?;
    for (index, step) in script.steps().iter().enumerate() {
        snapshot = match replay(&session, step) {
            Ok(Some(next)) => next,
            Ok(None) => snapshot,
            Err(err) => {
                error!(step = index + 1, op = step.name(); "Step failed");
                return Err(err);
            }
        };
    }

    let output = toml::to_string_pretty(snapshot.tree()).map_err(io::Error::other)?;
    fs::write(&args.output, output)?;
    registry.close(script.uri())?;

    info!(
        output_file = args.output,
        revision = snapshot.revision();
        "Render tree exported successfully"
    );

    Ok(())
}

/// Replay one step. Returns the snapshot the session serves afterwards, or
/// `None` if the step did not change it.
fn replay(session: &DiagramSession, step: &Step) -> Result<Option<Snapshot>, TandemError> {
    match step {
        Step::Edit(operation) => session.execute(operation).map(Some),
        Step::Measure { bounds, revision } => {
            let revision = match revision {
                Some(revision) => *revision,
                None => session.revision()?,
            };
            let applied = session.apply_measured_bounds(revision, bounds)?;
            if applied.is_none() {
                warn!(revision; "Measured bounds are stale, skipped");
            }
            Ok(applied)
        }
        Step::Undo => {
            let undone = session.undo()?;
            if undone.is_none() {
                warn!("Nothing to undo");
            }
            Ok(undone)
        }
        Step::Redo => {
            let redone = session.redo()?;
            if redone.is_none() {
                warn!("Nothing to redo");
            }
            Ok(redone)
        }
    }
}
