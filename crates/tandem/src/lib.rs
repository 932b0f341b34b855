//! Tandem - the server-side engine of a structural diagram editor.
//!
//! Tandem keeps two documents consistent: a semantic document holding the
//! diagram's content and a notation document holding its graphics. It
//! provides three operations on a pair of them:
//!
//! - [`command`] - applies client edits to both documents as one
//!   all-or-nothing transaction, including cascading removal.
//! - [`derive`] - builds the render tree for a diagram type.
//! - [`adjust`] - corrects the render tree once the client has measured it.
//!
//! [`session::DiagramSession`] ties them together under a per-diagram lock.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use tandem::{
//!     command::Operation,
//!     config::AppConfig,
//!     derive::DiagramKind,
//!     geometry::Point,
//!     semantic::ElementKind,
//!     session::SessionRegistry,
//!     store::MemoryStore,
//! };
//!
//! let registry = SessionRegistry::new(Arc::new(MemoryStore::new()), AppConfig::default());
//! let session = registry.open("mem://shop.uml", DiagramKind::UseCase).unwrap();
//!
//! let snapshot = session
//!     .execute(&Operation::AddElement {
//!         kind: ElementKind::Package,
//!         position: Point::new(10.0, 10.0),
//!         parent: None,
//!         name: Some("Checkout".to_string()),
//!     })
//!     .unwrap();
//!
//! assert_eq!(snapshot.revision(), 1);
//! assert_eq!(snapshot.created().unwrap(), "shop::package_1");
//! ```

pub mod adjust;
pub mod command;
pub mod config;
pub mod derive;
pub mod render;
pub mod session;
pub mod store;

mod error;

pub use tandem_core::{error::ModelError, geometry, identifier, notation, semantic};

pub use error::{Result, TandemError};
