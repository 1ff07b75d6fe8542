//! Planar geometry used by the scene index and hit testing.
//!
//! All coordinates are scene-space `f64` units. Rectangles are stored as an
//! origin plus size, `(x, y, width, height)`, matching how fixture bounds are
//! described in scene files and by the editor layer.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// A position in scene coordinates.
///
/// Serialized as a two-element `[x, y]` array.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation towards `other`; `t = 0` is `self`, `t = 1` is `other`.
    pub fn lerp(self, other: Point, t: f64) -> Point {
        self + (other - self) * t
    }

    pub fn midpoint(self, other: Point) -> Point {
        self.lerp(other, 0.5)
    }

    /// Squared distance, for comparisons that don't need the square root.
    pub fn distance_squared(self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Rectangle as `(x, y, width, height)` with `(x, y)` the upper-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rectangle containing both corners, in either order.
    ///
    /// A fixture drawn right-to-left still gets a non-negative width.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }
}

/// Axis-aligned bounds as `(xmin, ymin, xmax, ymax)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    /// Degenerate box containing a single point.
    pub fn from_point(p: Point) -> Self {
        Self {
            xmin: p.x,
            ymin: p.y,
            xmax: p.x,
            ymax: p.y,
        }
    }

    /// Bounds of all points, or `None` if the iterator is empty.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::from_point(first), |bb, p| bb.include(p)))
    }

    pub fn include(self, p: Point) -> Self {
        Self {
            xmin: self.xmin.min(p.x),
            ymin: self.ymin.min(p.y),
            xmax: self.xmax.max(p.x),
            ymax: self.ymax.max(p.y),
        }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.xmin + self.xmax) / 2.0,
            (self.ymin + self.ymax) / 2.0,
        )
    }
}

/// Euclidean distance between two points.
pub fn distance(p1: Point, p2: Point) -> f64 {
    (p2.x - p1.x).hypot(p2.y - p1.y)
}

/// Tests if `pos` is inside `rect` or on its edge.
pub fn hit_test_rect(rect: Rect, pos: Point) -> bool {
    pos.x >= rect.x
        && pos.x <= rect.x + rect.width
        && pos.y >= rect.y
        && pos.y <= rect.y + rect.height
}

/// Perpendicular distance from `point` to the infinite line through `start`
/// and `end`.
///
/// This is not segment distance: a point past either end of the segment but
/// laterally aligned with it is still reported as close. Callers pre-filter
/// with a bounding rect. A degenerate line (`start == end`) falls back to the
/// distance from `start`.
pub fn distance_point_to_line(start: Point, end: Point, point: Point) -> f64 {
    let length = distance(start, end);
    if length == 0.0 {
        return distance(start, point);
    }
    ((end.y - start.y) * point.x - (end.x - start.x) * point.y + end.x * start.y
        - end.y * start.x)
        .abs()
        / length
}

/// Grows `rect` by `delta / 2` on every side.
///
/// Used to pad the bounds of thin linear fixtures so they remain clickable.
pub fn inflate_rect(rect: Rect, delta: f64) -> Rect {
    let half = delta / 2.0;
    Rect::new(
        rect.x - half,
        rect.y - half,
        rect.width + delta,
        rect.height + delta,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn distance_is_euclidean() {
        assert!((distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0)) - 5.0).abs() < EPS);
        assert_eq!(distance(Point::new(2.0, 2.0), Point::new(2.0, 2.0)), 0.0);
    }

    #[test]
    fn hit_test_rect_is_inclusive() {
        let rect = Rect::new(10.0, 10.0, 20.0, 5.0);
        assert!(hit_test_rect(rect, Point::new(10.0, 10.0)));
        assert!(hit_test_rect(rect, Point::new(30.0, 15.0)));
        assert!(hit_test_rect(rect, Point::new(20.0, 12.0)));
        assert!(!hit_test_rect(rect, Point::new(30.1, 12.0)));
        assert!(!hit_test_rect(rect, Point::new(20.0, 9.9)));
    }

    #[test]
    fn line_distance_uses_infinite_line() {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(10.0, 0.0);
        assert!((distance_point_to_line(start, end, Point::new(5.0, 3.0)) - 3.0).abs() < EPS);
        // Far past the end of the segment, but on the line.
        assert!(distance_point_to_line(start, end, Point::new(500.0, 0.0)).abs() < EPS);
        // Diagonal line.
        let d = distance_point_to_line(start, Point::new(10.0, 10.0), Point::new(0.0, 10.0));
        assert!((d - 50.0_f64.sqrt()).abs() < EPS);
    }

    #[test]
    fn degenerate_line_distance_falls_back_to_point_distance() {
        let p = Point::new(1.0, 1.0);
        assert!((distance_point_to_line(p, p, Point::new(4.0, 5.0)) - 5.0).abs() < EPS);
    }

    #[test]
    fn inflate_rect_pads_half_delta_per_side() {
        let r = inflate_rect(Rect::new(0.0, 0.0, 100.0, 0.0), 10.0);
        assert_eq!(r, Rect::new(-5.0, -5.0, 110.0, 10.0));
        assert!(hit_test_rect(r, Point::new(50.0, 4.0)));
    }

    #[test]
    fn rect_from_corners_normalizes_direction() {
        let r = Rect::from_corners(Point::new(100.0, 50.0), Point::new(0.0, 0.0));
        assert_eq!(r, Rect::new(0.0, 0.0, 100.0, 50.0));
    }

    #[test]
    fn bounding_box_covers_all_points() {
        let bb = BoundingBox::from_points([
            Point::new(1.0, 5.0),
            Point::new(-2.0, 3.0),
            Point::new(4.0, -1.0),
        ])
        .unwrap();
        assert_eq!(
            bb,
            BoundingBox {
                xmin: -2.0,
                ymin: -1.0,
                xmax: 4.0,
                ymax: 5.0
            }
        );
        assert_eq!(bb.center(), Point::new(1.0, 2.0));
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn point_serializes_as_pair() {
        let p: Point = serde_json::from_str("[1.5, -2]").unwrap();
        assert_eq!(p, Point::new(1.5, -2.0));
        assert_eq!(serde_json::to_string(&p).unwrap(), "[1.5,-2.0]");
    }
}
