//! Tandem Core Types and Definitions
//!
//! This crate provides the document model shared by the Tandem engine:
//!
//! - **Identifiers**: Interned path identifiers ([`identifier::Id`])
//! - **Geometry**: Points, sizes and bounds ([`geometry`] module)
//! - **Semantic**: The content tree of typed nodes ([`semantic`] module)
//! - **Notation**: Graphical records proxying semantic nodes ([`notation`] module)
//! - **Errors**: Rejections raised by document lookups and edits ([`error::ModelError`])

pub mod error;
pub mod geometry;
pub mod identifier;
pub mod notation;
pub mod semantic;
