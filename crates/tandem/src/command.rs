//! Dual-document compound command engine.
//!
//! A client [`Operation`] is turned into a [`CompoundCommand`] by the
//! [`CommandBuilder`], which resolves and checks every path up front. The
//! command then runs its steps in order against a [`DocumentPair`]; each step
//! records the inverses of the primitive changes it makes in a [`Journal`].
//! If a step fails, the journal is replayed backwards and both documents end
//! up exactly as they were.

mod builder;
mod cascade;
mod compound;
mod operation;

pub use builder::CommandBuilder;
pub use compound::{
    Applied, Change, Command, CompoundCommand, Journal, NotationStep, ProxyRef, RemovalStats,
    ResultSlot, SemanticStep,
};
pub use operation::Operation;

use log::info;

use tandem_core::notation::DocumentPair;

use crate::error::Result;

/// Build and execute `operation` as one all-or-nothing transaction.
///
/// # Errors
///
/// Returns the rejection raised while building the command, or the error of
/// the first failing step after rolling back.
pub fn execute(pair: &mut DocumentPair, operation: &Operation) -> Result<Applied> {
    let command = CommandBuilder::new(pair).build(operation)?;
    info!(command = command.label(), steps = command.steps().len(); "Executing operation");
    command.execute(pair)
}
