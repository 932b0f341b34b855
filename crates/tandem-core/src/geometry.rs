//! Geometric primitives for notation records and render trees.
//!
//! # Overview
//!
//! - [`Point`] - A 2D coordinate in diagram space
//! - [`Size`] - Width and height dimensions
//! - [`Bounds`] - A rectangle defined by its minimum and maximum coordinates
//!
//! # Coordinate System
//!
//! Tandem uses the same coordinate system as the browser client:
//!
//! ```text
//!   (0,0) ────────► +X
//!     │
//!     │
//!     ▼
//!    +Y
//! ```
//!
//! Positions are the **top-left** corner of an element. Positions of shapes
//! nested inside a container are relative to the container's origin, not to
//! the diagram.

use serde::{Deserialize, Serialize};

/// A 2D point in diagram coordinate space.
///
/// # Examples
///
/// ```
/// # use tandem_core::geometry::Point;
/// let parent = Point::new(100.0, 40.0);
/// let absolute = Point::new(130.0, 95.0);
///
/// let relative = absolute.sub_point(parent);
/// assert_eq!(relative.x(), 30.0);
/// assert_eq!(relative.y(), 55.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    x: f32,
    y: f32,
}

impl Point {
    /// Creates a new point with the specified coordinates
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the x-coordinate of the point
    pub fn x(self) -> f32 {
        self.x
    }

    /// Returns the y-coordinate of the point
    pub fn y(self) -> f32 {
        self.y
    }

    /// Creates a new point with the specified x-coordinate
    pub fn with_x(mut self, x: f32) -> Self {
        self.x = x;
        self
    }

    /// Creates a new point with the specified y-coordinate
    pub fn with_y(mut self, y: f32) -> Self {
        self.y = y;
        self
    }

    /// Checks if both x and y coordinates are zero
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Adds another point to this point, returning a new point.
    pub fn add_point(self, other: Point) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    /// Subtracts another point from this point, returning a new point.
    pub fn sub_point(self, other: Point) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    /// Converts this top-left point and a size into bounds.
    pub fn to_bounds(self, size: Size) -> Bounds {
        Bounds::new_from_top_left(self, size)
    }
}

/// Width and height of an element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    width: f32,
    height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Returns the width dimension of this size
    pub fn width(self) -> f32 {
        self.width
    }

    /// Returns the height dimension of this size
    pub fn height(self) -> f32 {
        self.height
    }

    /// Creates a new size with the specified width
    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    /// Creates a new size with the specified height
    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    /// Returns a new Size with the maximum width and height between this size and another
    pub fn max(self, other: Size) -> Self {
        Self {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }

    /// Multiplies both dimensions by the given factor
    pub fn scale(self, factor: f32) -> Self {
        Self {
            width: self.width * factor,
            height: self.height * factor,
        }
    }

    /// Returns true if both width and height are zero
    pub fn is_zero(self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

/// A rectangular bounding box with minimum and maximum coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

impl Bounds {
    /// Creates a new bounds from a top-left point and a size
    pub fn new_from_top_left(top_left: Point, size: Size) -> Self {
        Self {
            min_x: top_left.x,
            min_y: top_left.y,
            max_x: top_left.x + size.width,
            max_y: top_left.y + size.height,
        }
    }

    /// Returns the minimum x-coordinate of the bounds
    pub fn min_x(self) -> f32 {
        self.min_x
    }

    /// Returns the minimum y-coordinate of the bounds
    pub fn min_y(self) -> f32 {
        self.min_y
    }

    /// Returns the maximum x-coordinate of the bounds
    pub fn max_x(self) -> f32 {
        self.max_x
    }

    /// Returns the maximum y-coordinate of the bounds
    pub fn max_y(self) -> f32 {
        self.max_y
    }

    /// Returns the width of the bounds
    pub fn width(self) -> f32 {
        self.max_x - self.min_x
    }

    /// Returns the height of the bounds
    pub fn height(self) -> f32 {
        self.max_y - self.min_y
    }

    /// Returns the top-left corner as a Point
    pub fn min_point(self) -> Point {
        Point {
            x: self.min_x,
            y: self.min_y,
        }
    }

    /// Converts bounds to a Size object
    pub fn to_size(self) -> Size {
        Size {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Merges two bounds into the smallest bounds containing both.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tandem_core::geometry::{Bounds, Point, Size};
    /// let area = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(100.0, 30.0));
    /// let child = Bounds::new_from_top_left(Point::new(-10.0, 40.0), Size::new(120.0, 80.0));
    ///
    /// let union = area.merge(&child);
    /// assert_eq!(union.min_x(), -10.0);
    /// assert_eq!(union.width(), 120.0);
    /// assert_eq!(union.height(), 120.0);
    /// ```
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Moves the bounds by the specified offset.
    pub fn translate(&self, offset: Point) -> Self {
        Self {
            min_x: self.min_x + offset.x,
            min_y: self.min_y + offset.y,
            max_x: self.max_x + offset.x,
            max_y: self.max_y + offset.y,
        }
    }

    /// Returns `true` if `other` lies entirely inside these bounds.
    pub fn contains(&self, other: &Self) -> bool {
        other.min_x >= self.min_x
            && other.min_y >= self.min_y
            && other.max_x <= self.max_x
            && other.max_y <= self.max_y
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    #[test]
    fn test_point_default() {
        let point = Point::default();
        assert!(point.is_zero());
    }

    #[test]
    fn test_point_add_sub() {
        let p1 = Point::new(10.0, 20.0);
        let p2 = Point::new(5.0, -5.0);

        let sum = p1.add_point(p2);
        assert_approx_eq!(f32, sum.x(), 15.0);
        assert_approx_eq!(f32, sum.y(), 15.0);

        let diff = p1.sub_point(p2);
        assert_approx_eq!(f32, diff.x(), 5.0);
        assert_approx_eq!(f32, diff.y(), 25.0);
    }

    #[test]
    fn test_point_with() {
        let point = Point::new(1.0, 2.0).with_x(7.0).with_y(9.0);
        assert_eq!(point, Point::new(7.0, 9.0));
    }

    #[test]
    fn test_size_scale() {
        let size = Size::new(40.0, 20.0).scale(1.4);
        assert_approx_eq!(f32, size.width(), 56.0);
        assert_approx_eq!(f32, size.height(), 28.0);
    }

    #[test]
    fn test_size_max() {
        let size = Size::new(10.0, 50.0).max(Size::new(30.0, 20.0));
        assert_eq!(size, Size::new(30.0, 50.0));
    }

    #[test]
    fn test_bounds_new_from_top_left() {
        let bounds = Point::new(5.0, 5.0).to_bounds(Size::new(40.0, 20.0));

        assert_approx_eq!(f32, bounds.min_x(), 5.0);
        assert_approx_eq!(f32, bounds.min_y(), 5.0);
        assert_approx_eq!(f32, bounds.max_x(), 45.0);
        assert_approx_eq!(f32, bounds.max_y(), 25.0);
        assert_eq!(bounds.to_size(), Size::new(40.0, 20.0));
    }

    #[test]
    fn test_bounds_translate() {
        let bounds = Bounds::new_from_top_left(Point::new(10.0, 20.0), Size::new(50.0, 30.0));
        let moved = bounds.translate(Point::new(100.0, 50.0));

        assert_eq!(moved.min_point(), Point::new(110.0, 70.0));
        assert_approx_eq!(f32, moved.width(), 50.0);
        assert_approx_eq!(f32, moved.height(), 30.0);
    }

    #[test]
    fn test_bounds_contains() {
        let outer = Bounds::new_from_top_left(Point::default(), Size::new(100.0, 100.0));
        let inner = Bounds::new_from_top_left(Point::new(10.0, 10.0), Size::new(20.0, 20.0));
        let straddling = Bounds::new_from_top_left(Point::new(90.0, 10.0), Size::new(20.0, 20.0));

        assert!(outer.contains(&inner));
        assert!(!outer.contains(&straddling));
    }
}
