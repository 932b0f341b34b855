//! Layout adjustment: corrects a render tree after the client has reported
//! measured bounds.
//!
//! The pass works on the render tree only. It never touches the semantic or
//! notation documents.

use log::{debug, trace};
use serde::Deserialize;

use tandem_core::{
    geometry::{Point, Size},
    identifier::Id,
};

use crate::{
    config::LayoutConfig,
    render::{CHILDREN_SEGMENT, HEADER_SEGMENT, RenderKind, RenderNode, RenderTree},
};

/// Bounds measured by the client for one render node.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ElementBounds {
    id: Id,
    size: Size,
    #[serde(default)]
    position: Option<Point>,
}

impl ElementBounds {
    pub fn new(id: Id, size: Size) -> Self {
        Self {
            id,
            size,
            position: None,
        }
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn position(&self) -> Option<Point> {
        self.position
    }
}

/// Apply `bounds` to `tree` and correct the sizes and positions of its
/// top-level nodes.
pub fn adjust(tree: &mut RenderTree, bounds: &[ElementBounds], config: &LayoutConfig) {
    debug!(revision = tree.revision(), measured = bounds.len(); "Adjusting render tree");
    apply_bounds(tree, bounds);

    for node in tree.root_mut().children_mut() {
        match node.kind() {
            RenderKind::UseCase => adjust_use_case(node, config),
            RenderKind::Component | RenderKind::Package => adjust_container(node, config),
            // Actor label placement is left as measured.
            _ => {}
        }
    }
}

fn apply_bounds(tree: &mut RenderTree, bounds: &[ElementBounds]) {
    for measured in bounds {
        let Some(node) = tree.find_mut(measured.id) else {
            debug!(id:% = measured.id; "Measured bounds for unknown render node");
            continue;
        };
        node.set_size(Some(measured.size));
        if let Some(position) = measured.position {
            node.set_position(position);
        }
    }
}

/// Enlarge a use case and centre its children horizontally.
fn adjust_use_case(node: &mut RenderNode, config: &LayoutConfig) {
    let Some(size) = node.size() else {
        trace!(id:% = node.id(); "Use case has no size, skipping");
        return;
    };
    let size = size.scale(config.use_case_scale());
    node.set_size(Some(size));

    for child in node.children_mut() {
        let child_width = child.size().unwrap_or_default().width();
        let position = child.position();
        child.set_position(Point::new(
            size.width() / 2.0 - child_width / 2.0,
            position.y() + config.label_offset(),
        ));
    }
}

/// Grow a container to fit its children, bottom-up.
///
/// Nested containers and use cases are corrected first. The union of the
/// children's bounds is then compared against the children compartment
/// (offset by the header height); overflow to the right or bottom grows the
/// container, overflow to the left or top moves it and rebases the children.
fn adjust_container(node: &mut RenderNode, config: &LayoutConfig) {
    let header_id = node.id().nested(HEADER_SEGMENT);
    let children_id = node.id().nested(CHILDREN_SEGMENT);

    let header_height = node
        .child(header_id)
        .and_then(RenderNode::size)
        .map_or(config.header_height(), Size::height);

    let mut min = Point::default();
    let mut extent = node.size().unwrap_or_default();
    let mut changed_position = false;
    let mut changed_size = false;

    for compartment in node.children_mut() {
        if compartment.id() != children_id {
            continue;
        }
        extent = compartment.size().unwrap_or_default();

        for child in compartment.children_mut() {
            match child.kind() {
                RenderKind::UseCase => adjust_use_case(child, config),
                RenderKind::Component | RenderKind::Package => adjust_container(child, config),
                _ => {}
            }

            let position = child.position();
            let size = child.size().unwrap_or_default();
            if position.x() < min.x() {
                min = min.with_x(position.x());
                changed_position = true;
            }
            if position.y() < min.y() {
                min = min.with_y(position.y());
                changed_position = true;
            }
            if position.x() + size.width() > extent.width() {
                extent = extent.with_width(position.x() + size.width());
                changed_size = true;
            }
            if position.y() + size.height() + header_height > extent.height() {
                extent = extent.with_height(position.y() + size.height() + header_height);
                changed_size = true;
            }
        }
    }

    if changed_size {
        let size = Size::new(
            extent.width() - min.x() + config.margin(),
            extent.height() + config.margin(),
        );
        trace!(id:% = node.id(), size:?; "Growing container");
        node.set_size(Some(size));
    }

    if changed_position {
        trace!(id:% = node.id(), offset:? = min; "Shifting container");
        node.set_position(node.position().add_point(min));
        for compartment in node.children_mut() {
            if compartment.id() != children_id {
                continue;
            }
            for child in compartment.children_mut() {
                child.set_position(child.position().sub_point(min));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    fn container(path: Id, kind: RenderKind, children: Vec<RenderNode>) -> RenderNode {
        RenderNode::new(path, kind)
            .with_bounds(Point::new(0.0, 0.0), Some(Size::new(50.0, 50.0)))
            .with_child(RenderNode::new(path.nested(HEADER_SEGMENT), RenderKind::Header))
            .with_child(
                RenderNode::new(path.nested(CHILDREN_SEGMENT), RenderKind::Compartment)
                    .with_children(children),
            )
    }

    fn tree(children: Vec<RenderNode>) -> RenderTree {
        RenderTree::new(
            1,
            RenderNode::new(Id::new("model"), RenderKind::Graph).with_children(children),
        )
    }

    #[test]
    fn test_use_case_scaled_and_centred() {
        let path = Id::new("model::use_case_1");
        let label = path.nested("label");
        let mut tree = tree(vec![
            RenderNode::new(path, RenderKind::UseCase)
                .with_child(RenderNode::new(label, RenderKind::Text)),
        ]);

        adjust(
            &mut tree,
            &[
                ElementBounds::new(path, Size::new(100.0, 50.0)),
                ElementBounds::new(label, Size::new(40.0, 10.0)).with_position(Point::new(0.0, 5.0)),
            ],
            &LayoutConfig::default(),
        );

        let use_case = tree.find(path).unwrap();
        assert_approx_eq!(f32, use_case.size().unwrap().width(), 140.0);
        assert_approx_eq!(f32, use_case.size().unwrap().height(), 70.0);
        let label = tree.find(label).unwrap();
        assert_approx_eq!(f32, label.position().x(), 50.0);
        assert_approx_eq!(f32, label.position().y(), 15.0);
    }

    #[test]
    fn test_container_grows_to_fit_child() {
        let package = Id::new("model::package_1");
        let actor = package.nested("actor_2");
        let mut tree = tree(vec![container(
            package,
            RenderKind::Package,
            vec![RenderNode::new(actor, RenderKind::Actor)
                .with_bounds(Point::new(5.0, 5.0), None)],
        )]);

        adjust(
            &mut tree,
            &[
                ElementBounds::new(package.nested(HEADER_SEGMENT), Size::new(30.0, 20.0)),
                ElementBounds::new(package.nested(CHILDREN_SEGMENT), Size::new(30.0, 10.0)),
                ElementBounds::new(actor, Size::new(40.0, 20.0)),
            ],
            &LayoutConfig::default(),
        );

        let size = tree.find(package).unwrap().size().unwrap();
        assert_approx_eq!(f32, size.width(), 5.0 + 40.0 + 20.0);
        assert_approx_eq!(f32, size.height(), 5.0 + 20.0 + 20.0 + 20.0);
        assert_eq!(tree.find(actor).unwrap().position(), Point::new(5.0, 5.0));
    }

    #[test]
    fn test_negative_origin_shifts_container() {
        let component = Id::new("model::component_1");
        let actor = component.nested("actor_2");
        let mut tree = tree(vec![container(
            component,
            RenderKind::Component,
            vec![RenderNode::new(actor, RenderKind::Actor)
                .with_bounds(Point::new(-10.0, -4.0), Some(Size::new(5.0, 5.0)))],
        )]);
        tree.find_mut(component)
            .unwrap()
            .set_position(Point::new(100.0, 100.0));

        adjust(
            &mut tree,
            &[ElementBounds::new(
                component.nested(CHILDREN_SEGMENT),
                Size::new(200.0, 200.0),
            )],
            &LayoutConfig::default(),
        );

        assert_eq!(
            tree.find(component).unwrap().position(),
            Point::new(90.0, 96.0)
        );
        assert_eq!(tree.find(actor).unwrap().position(), Point::default());
    }

    #[test]
    fn test_nested_container_adjusted_first() {
        let outer = Id::new("model::package_1");
        let inner = outer.nested("component_2");
        let use_case = inner.nested("use_case_3");
        let inner_node = container(
            inner,
            RenderKind::Component,
            vec![RenderNode::new(use_case, RenderKind::UseCase)
                .with_bounds(Point::new(0.0, 0.0), None)],
        )
        .with_bounds(Point::new(10.0, 10.0), Some(Size::new(20.0, 20.0)));
        let mut tree = tree(vec![container(outer, RenderKind::Package, vec![inner_node])]);

        adjust(
            &mut tree,
            &[
                ElementBounds::new(use_case, Size::new(100.0, 40.0)),
                ElementBounds::new(inner.nested(CHILDREN_SEGMENT), Size::new(10.0, 10.0)),
                ElementBounds::new(outer.nested(CHILDREN_SEGMENT), Size::new(10.0, 10.0)),
            ],
            &LayoutConfig::default(),
        );

        // 100 x 40 scaled by 1.4, plus default header 38 and margin 20.
        let inner_size = tree.find(inner).unwrap().size().unwrap();
        assert_approx_eq!(f32, inner_size.width(), 160.0);
        assert_approx_eq!(f32, inner_size.height(), 56.0 + 38.0 + 20.0);

        let outer_size = tree.find(outer).unwrap().size().unwrap();
        assert_approx_eq!(f32, outer_size.width(), 10.0 + 160.0 + 20.0);
        assert_approx_eq!(f32, outer_size.height(), 10.0 + 114.0 + 38.0 + 20.0);
    }

    #[test]
    fn test_unknown_ids_ignored() {
        let mut tree = tree(Vec::new());
        let before = tree.clone();

        adjust(
            &mut tree,
            &[ElementBounds::new(Id::new("model::ghost"), Size::new(1.0, 1.0))],
            &LayoutConfig::default(),
        );

        assert_eq!(tree, before);
    }
}
