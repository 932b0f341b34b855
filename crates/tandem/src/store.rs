//! Structural-model store interface.
//!
//! The engine does not know how documents are persisted. A [`ModelStore`]
//! loads and saves document pairs by URI; [`MemoryStore`] keeps them in memory.

use std::{collections::HashMap, sync::Mutex};

use log::debug;

use tandem_core::notation::DocumentPair;

use crate::error::{Result, TandemError};

/// Loads and saves document pairs.
pub trait ModelStore: Send + Sync {
    /// Load the pair stored under `uri`.
    fn load(&self, uri: &str) -> Result<DocumentPair>;

    /// Store `pair` under `uri`, replacing whatever was there.
    fn save(&self, uri: &str, pair: &DocumentPair) -> Result<()>;
}

/// In-memory [`ModelStore`].
///
/// Loading an unknown URI yields a fresh pair whose root is named after the
/// last path segment of the URI, without its extension.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, DocumentPair>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with `pair` under `uri`.
    pub fn insert(&self, uri: impl Into<String>, pair: DocumentPair) -> Result<()> {
        self.documents
            .lock()
            .map_err(|_| TandemError::Store("memory store lock poisoned".to_string()))?
            .insert(uri.into(), pair);
        Ok(())
    }
}

impl ModelStore for MemoryStore {
    fn load(&self, uri: &str) -> Result<DocumentPair> {
        let documents = self
            .documents
            .lock()
            .map_err(|_| TandemError::Store("memory store lock poisoned".to_string()))?;
        match documents.get(uri) {
            Some(pair) => Ok(pair.clone()),
            None => {
                debug!(uri; "Unknown URI, creating an empty model");
                Ok(DocumentPair::new(&root_name(uri)))
            }
        }
    }

    fn save(&self, uri: &str, pair: &DocumentPair) -> Result<()> {
        debug!(uri, elements = pair.semantic.len(), records = pair.notation.len(); "Saving model");
        self.insert(uri, pair.clone())
    }
}

/// Root node name for a model loaded from `uri`.
fn root_name(uri: &str) -> String {
    let file = uri.rsplit(['/', '\\']).next().unwrap_or(uri);
    let stem = file.split('.').next().unwrap_or(file);
    let name: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.is_empty() {
        "model".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use tandem_core::semantic::ElementKind;

    use super::*;

    #[test]
    fn test_root_name() {
        assert_eq!(root_name("file:///tmp/billing.uml"), "billing");
        assert_eq!(root_name("orders"), "orders");
        assert_eq!(root_name("file:///tmp/my-model.uml"), "my_model");
        assert_eq!(root_name("file:///tmp/"), "model");
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        let mut pair = store.load("mem://shop.uml").unwrap();
        let root = pair.semantic.root();
        pair.semantic
            .create(root, ElementKind::Actor, Some("Buyer"))
            .unwrap();

        store.save("mem://shop.uml", &pair).unwrap();

        assert_eq!(store.load("mem://shop.uml").unwrap(), pair);
        assert_eq!(pair.semantic.root(), "shop");
    }
}
