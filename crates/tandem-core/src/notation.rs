//! Notation document: purely graphical records that point into the semantic
//! document through path proxies.
//!
//! A record never owns the semantic node it refers to. Removing a semantic
//! node leaves its records in place until they are removed by an explicit
//! paired edit; [`DocumentPair::dangling_proxies`] reports the records such an
//! omission would leave behind.

use indexmap::IndexMap;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ModelError, Result},
    geometry::{Point, Size},
    identifier::Id,
    semantic::SemanticDocument,
};

/// Segment that marks comment connector keys.
pub const COMMENT_EDGE_SEGMENT: &str = "commentEdge";

/// Build the key of the connector from `comment` to `target`.
///
/// The target path is flattened with `.` so the key stays one segment below
/// the `commentEdge` marker.
///
/// # Examples
///
/// ```
/// # use tandem_core::{identifier::Id, notation::connector_key};
/// let key = connector_key(Id::new("model::comment_4"), Id::new("model::package_1"));
/// assert_eq!(key, "model::comment_4::commentEdge::model.package_1");
/// ```
pub fn connector_key(comment: Id, target: Id) -> Id {
    let flat = target.to_string().replace(crate::identifier::SEPARATOR, ".");
    comment.nested(COMMENT_EDGE_SEGMENT).nested(&flat)
}

/// Returns `true` if `key` names a comment connector.
pub fn is_connector_key(key: Id) -> bool {
    key.with_str(|key| key.contains(&format!("::{COMMENT_EDGE_SEGMENT}::")))
}

/// Graphical payload of a notation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    /// A node shape. `position` is relative to the owning container's shape.
    Shape {
        position: Point,
        size: Option<Size>,
    },
    /// Edge of a relationship node.
    Edge { routing: Vec<Point> },
    /// Comment-to-element connector. `target` is a detached attribute of the
    /// comment and is not required to resolve.
    Connector { target: Id, routing: Vec<Point> },
}

/// One graphical element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotationRecord {
    key: Id,
    proxy: Id,
    geometry: Geometry,
}

impl NotationRecord {
    /// Shape record for the node at `proxy`, keyed by the same path.
    pub fn shape(proxy: Id, position: Point, size: Option<Size>) -> Self {
        Self {
            key: proxy,
            proxy,
            geometry: Geometry::Shape { position, size },
        }
    }

    /// Edge record for the relationship at `proxy`, keyed by the same path.
    pub fn edge(proxy: Id, routing: Vec<Point>) -> Self {
        Self {
            key: proxy,
            proxy,
            geometry: Geometry::Edge { routing },
        }
    }

    /// Connector record from `comment` to `target`.
    pub fn connector(comment: Id, target: Id) -> Self {
        Self {
            key: connector_key(comment, target),
            proxy: comment,
            geometry: Geometry::Connector {
                target,
                routing: Vec::new(),
            },
        }
    }

    pub fn key(&self) -> Id {
        self.key
    }

    /// Path of the semantic node this record stands for.
    pub fn proxy(&self) -> Id {
        self.proxy
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Position and size, for shape records.
    pub fn bounds(&self) -> Option<(Point, Option<Size>)> {
        match self.geometry {
            Geometry::Shape { position, size } => Some((position, size)),
            _ => None,
        }
    }

    /// Routing points, for edge and connector records.
    pub fn routing(&self) -> Option<&[Point]> {
        match &self.geometry {
            Geometry::Shape { .. } => None,
            Geometry::Edge { routing } | Geometry::Connector { routing, .. } => Some(routing),
        }
    }

    /// Connector target, for connector records.
    pub fn connector_target(&self) -> Option<Id> {
        match self.geometry {
            Geometry::Connector { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// Primitive mutation of a [`NotationDocument`]. Applying one returns its
/// inverse.
#[derive(Debug, Clone, PartialEq)]
pub enum NotationChange {
    InsertRecord {
        index: usize,
        record: NotationRecord,
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

/// Ordered collection of notation records keyed by record key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotationDocument {
    records: IndexMap<Id, NotationRecord>,
}

impl NotationDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in document order.
    pub fn records(&self) -> impl Iterator<Item = &NotationRecord> {
        self.records.values()
    }

    pub fn get(&self, key: Id) -> Option<&NotationRecord> {
        self.records.get(&key)
    }

    /// Shape record of the node at `proxy`.
    pub fn shape_for(&self, proxy: Id) -> Option<&NotationRecord> {
        self.records
            .get(&proxy)
            .filter(|record| matches!(record.geometry, Geometry::Shape { .. }))
    }

    /// Edge record of the relationship at `proxy`.
    pub fn edge_for(&self, proxy: Id) -> Option<&NotationRecord> {
        self.records
            .get(&proxy)
            .filter(|record| matches!(record.geometry, Geometry::Edge { .. }))
    }

    /// Connector from `comment` to `target`.
    pub fn connector(&self, comment: Id, target: Id) -> Option<&NotationRecord> {
        self.records.get(&connector_key(comment, target))
    }

    /// All records whose proxy is exactly `proxy`.
    pub fn records_for(&self, proxy: Id) -> impl Iterator<Item = &NotationRecord> {
        self.records
            .values()
            .filter(move |record| record.proxy == proxy)
    }

    /// All connectors whose target is `target` or lies below it.
    pub fn connectors_into(&self, target: Id) -> impl Iterator<Item = &NotationRecord> {
        self.records.values().filter(move |record| {
            record
                .connector_target()
                .is_some_and(|t| t.is_within(target))
        })
    }

    /// Apply a primitive change and return its inverse.
    pub fn apply(&mut self, change: NotationChange) -> Result<NotationChange> {
        trace!(change:?; "Applying notation change");
        match change {
            NotationChange::InsertRecord { index, record } => {
                let key = record.key;
                if self.records.contains_key(&key) {
                    return Err(ModelError::DuplicateRecord(key));
                }
                let index = index.min(self.records.len());
                self.records.shift_insert(index, key, record);
                Ok(NotationChange::RemoveRecord { key })
            }
            NotationChange::RemoveRecord { key } => {
                let (index, _, record) = self
                    .records
                    .shift_remove_full(&key)
                    .ok_or(ModelError::RecordNotFound(key))?;
                Ok(NotationChange::InsertRecord { index, record })
            }
            NotationChange::SetBounds {
                key,
                position,
                size,
            } => {
                let record = self
                    .records
                    .get_mut(&key)
                    .ok_or(ModelError::RecordNotFound(key))?;
                let Geometry::Shape {
                    position: old_position,
                    size: old_size,
                } = &mut record.geometry
                else {
                    return Err(ModelError::GeometryMismatch {
                        key,
                        expected: "shape",
                    });
                };
                let inverse = NotationChange::SetBounds {
                    key,
                    position: *old_position,
                    size: *old_size,
                };
                *old_position = position;
                *old_size = size;
                Ok(inverse)
            }
            NotationChange::SetRouting { key, routing } => {
                let record = self
                    .records
                    .get_mut(&key)
                    .ok_or(ModelError::RecordNotFound(key))?;
                match &mut record.geometry {
                    Geometry::Edge { routing: current }
                    | Geometry::Connector {
                        routing: current, ..
                    } => {
                        let previous = std::mem::replace(current, routing);
                        Ok(NotationChange::SetRouting {
                            key,
                            routing: previous,
                        })
                    }
                    Geometry::Shape { .. } => Err(ModelError::GeometryMismatch {
                        key,
                        expected: "edge",
                    }),
                }
            }
        }
    }
}

/// A semantic document together with its notation document.
///
/// The pair is the unit that is loaded, locked, edited and saved.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPair {
    pub semantic: SemanticDocument,
    pub notation: NotationDocument,
}

impl DocumentPair {
    /// Create an empty pair whose root `Model` node is named `root`.
    pub fn new(root: &str) -> Self {
        Self {
            semantic: SemanticDocument::new(root),
            notation: NotationDocument::new(),
        }
    }

    /// Keys of records whose proxy does not resolve to a live semantic node.
    ///
    /// An empty result means the pair is consistent.
    pub fn dangling_proxies(&self) -> Vec<Id> {
        self.notation
            .records()
            .filter(|record| !self.semantic.contains(record.proxy))
            .map(NotationRecord::key)
            .collect()
    }

    /// Absolute origin of the node at `path`: the sum of the shape positions
    /// of the node and all of its ancestors. The root's origin is `(0, 0)`.
    pub fn absolute_origin(&self, path: Id) -> Point {
        let mut origin = Point::default();
        let mut current = Some(path);
        while let Some(p) = current {
            if let Some((position, _)) = self.notation.shape_for(p).and_then(NotationRecord::bounds)
            {
                origin = origin.add_point(position);
            }
            current = self.semantic.get(p).and_then(|node| node.owner());
        }
        origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::{ElementKind, SemanticChange};

    fn sample() -> (DocumentPair, Id, Id) {
        let mut pair = DocumentPair::new("model");
        let root = pair.semantic.root();
        let package = pair
            .semantic
            .create(root, ElementKind::Package, Some("Billing"))
            .unwrap();
        let actor = pair
            .semantic
            .create(package, ElementKind::Actor, Some("Clerk"))
            .unwrap();
        pair.notation
            .apply(NotationChange::InsertRecord {
                index: 0,
                record: NotationRecord::shape(
                    package,
                    Point::new(100.0, 50.0),
                    Some(Size::new(200.0, 150.0)),
                ),
            })
            .unwrap();
        pair.notation
            .apply(NotationChange::InsertRecord {
                index: 1,
                record: NotationRecord::shape(actor, Point::new(10.0, 20.0), None),
            })
            .unwrap();
        (pair, package, actor)
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let (mut pair, package, _) = sample();

        let err = pair
            .notation
            .apply(NotationChange::InsertRecord {
                index: 0,
                record: NotationRecord::shape(package, Point::default(), None),
            })
            .unwrap_err();

        assert_eq!(err, ModelError::DuplicateRecord(package));
    }

    #[test]
    fn test_remove_inverse_restores_order() {
        let (mut pair, package, _) = sample();
        let before = pair.notation.clone();

        let inverse = pair
            .notation
            .apply(NotationChange::RemoveRecord { key: package })
            .unwrap();
        assert!(pair.notation.shape_for(package).is_none());

        pair.notation.apply(inverse).unwrap();
        assert_eq!(pair.notation, before);
    }

    #[test]
    fn test_set_bounds_on_edge_rejected() {
        let (mut pair, package, actor) = sample();
        let association = Id::new("model::association_9");
        pair.notation
            .apply(NotationChange::InsertRecord {
                index: 2,
                record: NotationRecord::edge(association, Vec::new()),
            })
            .unwrap();

        let err = pair
            .notation
            .apply(NotationChange::SetBounds {
                key: association,
                position: Point::default(),
                size: None,
            })
            .unwrap_err();
        assert!(matches!(err, ModelError::GeometryMismatch { .. }));

        let inverse = pair
            .notation
            .apply(NotationChange::SetBounds {
                key: actor,
                position: Point::new(1.0, 2.0),
                size: Some(Size::new(3.0, 4.0)),
            })
            .unwrap();
        pair.notation.apply(inverse).unwrap();
        assert_eq!(
            pair.notation.shape_for(actor).and_then(NotationRecord::bounds),
            Some((Point::new(10.0, 20.0), None))
        );
        assert!(pair.notation.shape_for(package).is_some());
    }

    #[test]
    fn test_absolute_origin_sums_ancestors() {
        let (pair, package, actor) = sample();

        assert_eq!(pair.absolute_origin(package), Point::new(100.0, 50.0));
        assert_eq!(pair.absolute_origin(actor), Point::new(110.0, 70.0));
        assert_eq!(pair.absolute_origin(pair.semantic.root()), Point::default());
    }

    #[test]
    fn test_dangling_proxies_detected() {
        let (mut pair, package, actor) = sample();
        assert!(pair.dangling_proxies().is_empty());

        pair.semantic
            .apply(SemanticChange::DetachSubtree { path: package })
            .unwrap();

        let mut dangling = pair.dangling_proxies();
        dangling.sort_by_key(|id| id.to_string());
        assert_eq!(dangling, vec![package, actor]);
    }

    #[test]
    fn test_connector_target_is_detached() {
        let (mut pair, package, _) = sample();
        let root = pair.semantic.root();
        let comment = pair
            .semantic
            .create(root, ElementKind::Comment, Some("note"))
            .unwrap();
        pair.notation
            .apply(NotationChange::InsertRecord {
                index: 0,
                record: NotationRecord::connector(comment, Id::new("model::gone_1")),
            })
            .unwrap();

        assert!(pair.dangling_proxies().is_empty());
        assert!(pair.notation.connector(comment, package).is_none());
        let key = connector_key(comment, Id::new("model::gone_1"));
        assert!(is_connector_key(key));
        assert!(!is_connector_key(package));
    }
}
