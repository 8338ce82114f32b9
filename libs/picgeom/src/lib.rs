//! Integer Manhattan geometry for photonic layout.
//!
//! All coordinates are integer database units. Only Manhattan geometry
//! (rotations by multiples of 90 degrees, optional mirroring) is supported,
//! which keeps every transformation exact.

use serde::{Deserialize, Serialize};

use transform::{Transform, Transformation, Translate};

pub mod bbox;
pub mod orientation;
pub mod transform;

/// A location in database units.
#[derive(
    Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    /// Creates a new [`Point`] shifted by `p`.
    #[inline]
    pub fn translated(&self, p: Point) -> Self {
        let mut pt = *self;
        pt.translate(p);
        pt
    }

    /// Scales both coordinates by `k`.
    #[inline]
    pub fn scaled(&self, k: i64) -> Self {
        Self::new(self.x * k, self.y * k)
    }
}

impl std::ops::Add<Point> for Point {
    type Output = Self;
    fn add(self, rhs: Point) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign<Point> for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub<Point> for Point {
    type Output = Self;
    fn sub(self, rhs: Point) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::SubAssign<Point> for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl std::ops::Neg for Point {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

impl From<(i64, i64)> for Point {
    fn from(value: (i64, i64)) -> Self {
        Self::new(value.0, value.1)
    }
}

/// A centerline through `points`, drawn `width` wide. Waveguides and metal
/// routes are paths.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Path {
    pub points: Vec<Point>,
    pub width: i64,
}

impl Path {
    /// Creates a new path through `points`.
    pub fn new(points: Vec<Point>, width: i64) -> Self {
        Self { points, width }
    }

    /// Returns the first and last points of the path, if any.
    pub fn endpoints(&self) -> Option<(Point, Point)> {
        Some((*self.points.first()?, *self.points.last()?))
    }
}

impl Translate for Path {
    fn translate(&mut self, p: Point) {
        for pt in self.points.iter_mut() {
            pt.translate(p);
        }
    }
}

/// A closed polygon. The last point connects back to the first.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Translate for Polygon {
    fn translate(&mut self, p: Point) {
        for pt in self.points.iter_mut() {
            pt.translate(p);
        }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rect {
    pub p0: Point,
    pub p1: Point,
}

impl Rect {
    /// Creates a new rectangle, normalizing the corners.
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }

    #[inline]
    pub fn width(&self) -> i64 {
        self.p1.x - self.p0.x
    }

    #[inline]
    pub fn height(&self) -> i64 {
        self.p1.y - self.p0.y
    }
}

impl Translate for Rect {
    fn translate(&mut self, p: Point) {
        self.p0.translate(p);
        self.p1.translate(p);
    }
}

/// Any drawable shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Shape {
    Rect(Rect),
    Polygon(Polygon),
    Path(Path),
}

impl From<Rect> for Shape {
    fn from(value: Rect) -> Self {
        Self::Rect(value)
    }
}

impl From<Polygon> for Shape {
    fn from(value: Polygon) -> Self {
        Self::Polygon(value)
    }
}

impl From<Path> for Shape {
    fn from(value: Path) -> Self {
        Self::Path(value)
    }
}

impl Transform for Shape {
    fn transform(&self, trans: Transformation) -> Self {
        match self {
            Self::Rect(s) => Self::Rect(s.transform(trans)),
            Self::Polygon(s) => Self::Polygon(s.transform(trans)),
            Self::Path(s) => Self::Path(s.transform(trans)),
        }
    }
}

impl Translate for Shape {
    fn translate(&mut self, p: Point) {
        match self {
            Self::Rect(s) => s.translate(p),
            Self::Polygon(s) => s.translate(p),
            Self::Path(s) => s.translate(p),
        }
    }
}

impl Shape {
    pub fn as_path(&self) -> Option<&Path> {
        if let Shape::Path(path) = self {
            Some(path)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_corners_are_normalized() {
        let r = Rect::new(Point::new(10, -2), Point::new(-4, 6));
        assert_eq!(r.p0, Point::new(-4, -2));
        assert_eq!(r.p1, Point::new(10, 6));
        assert_eq!((r.width(), r.height()), (14, 8));
    }

    #[test]
    fn path_endpoints() {
        let path = Path::new(
            vec![Point::new(0, 0), Point::new(100, 0), Point::new(100, 50)],
            10,
        );
        assert_eq!(path.endpoints(), Some((Point::new(0, 0), Point::new(100, 50))));
        assert_eq!(Path::new(Vec::new(), 10).endpoints(), None);
    }

    #[test]
    fn translated_shapes_move_every_point() {
        let mut shape = Shape::Path(Path::new(vec![Point::zero(), Point::new(5, 0)], 2));
        shape.translate(Point::new(1, 1));
        assert_eq!(
            shape.as_path().map(|p| p.points.clone()),
            Some(vec![Point::new(1, 1), Point::new(6, 1)])
        );
    }
}
