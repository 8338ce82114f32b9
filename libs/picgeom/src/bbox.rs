//! Bounding boxes.

use serde::{Deserialize, Serialize};

use super::transform::{Transform, Transformation};
use super::{Path, Point, Polygon, Rect, Shape};

/// An axis-aligned box with `p0` at the lower left and `p1` at the upper right.
///
/// Unlike a [`Rect`], a box may be empty; [`Bbox::empty`] is the identity of
/// [`Bbox::union`].
#[derive(Debug, Copy, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Bbox {
    pub p0: Point,
    pub p1: Point,
}

impl Default for Bbox {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bbox {
    #[inline]
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }
    /// Zero for an empty box.
    #[inline]
    pub fn width(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.p1.x - self.p0.x
        }
    }
    #[inline]
    pub fn height(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.p1.y - self.p0.y
        }
    }
    /// Creates a new zero-area [`Bbox`] from a single [`Point`].
    pub fn from_point(pt: Point) -> Self {
        Self { p0: pt, p1: pt }
    }
    pub fn empty() -> Self {
        Self {
            p0: Point::new(i64::MAX, i64::MAX),
            p1: Point::new(i64::MIN, i64::MIN),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.p0.x > self.p1.x || self.p0.y > self.p1.y
    }
    pub fn center(&self) -> Point {
        Point::new((self.p0.x + self.p1.x) / 2, (self.p0.y + self.p1.y) / 2)
    }
    /// Computes the union with `other`.
    pub fn union(&self, other: Bbox) -> Bbox {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return other;
        }
        Bbox::new(
            Point::new(self.p0.x.min(other.p0.x), self.p0.y.min(other.p0.y)),
            Point::new(self.p1.x.max(other.p1.x), self.p1.y.max(other.p1.y)),
        )
    }
}

impl From<Rect> for Bbox {
    fn from(r: Rect) -> Self {
        Self { p0: r.p0, p1: r.p1 }
    }
}

impl Transform for Bbox {
    fn transform(&self, trans: Transformation) -> Self {
        if self.is_empty() {
            return *self;
        }
        Bbox::new(self.p0.transform(trans), self.p1.transform(trans))
    }
}

/// Shapes with a bounding box.
pub trait BoundBox {
    fn bbox(&self) -> Bbox;
}

impl BoundBox for Point {
    fn bbox(&self) -> Bbox {
        Bbox::from_point(*self)
    }
}

impl BoundBox for Rect {
    fn bbox(&self) -> Bbox {
        Bbox::from(*self)
    }
}

impl BoundBox for Polygon {
    fn bbox(&self) -> Bbox {
        self.points.bbox()
    }
}

impl BoundBox for Path {
    /// Includes half the path width on every side of the centerline.
    fn bbox(&self) -> Bbox {
        let mut bbox = self.points.bbox();
        if !bbox.is_empty() {
            let half = self.width / 2;
            bbox.p0 -= Point::new(half, half);
            bbox.p1 += Point::new(half, half);
        }
        bbox
    }
}

impl BoundBox for Shape {
    fn bbox(&self) -> Bbox {
        match self {
            Shape::Rect(r) => r.bbox(),
            Shape::Polygon(p) => p.bbox(),
            Shape::Path(p) => p.bbox(),
        }
    }
}

impl BoundBox for Vec<Point> {
    fn bbox(&self) -> Bbox {
        self.iter()
            .fold(Bbox::empty(), |acc, pt| acc.union(pt.bbox()))
    }
}
