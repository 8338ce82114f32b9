//! Transformation types and traits.

use serde::{Deserialize, Serialize};

use super::orientation::{Orientation, Rotation};
use super::{Path, Point, Polygon, Rect};

/// An integer affine map: `x -> a * x + b`.
///
/// Only Manhattan matrices (entries in `{-1, 0, 1}`, determinant `±1`) are
/// ever constructed, so composition and inversion are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transformation {
    /// Row-major matrix part.
    pub a: [[i64; 2]; 2],
    /// Translation, applied after the matrix.
    pub b: [i64; 2],
}

impl Default for Transformation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transformation {
    /// The identity.
    pub fn identity() -> Self {
        Self {
            a: [[1, 0], [0, 1]],
            b: [0, 0],
        }
    }
    /// A pure translation.
    pub fn translate(x: i64, y: i64) -> Self {
        Self {
            a: [[1, 0], [0, 1]],
            b: [x, y],
        }
    }
    /// Returns a counter-clockwise rotation by `rotation` about the origin.
    pub fn rotate(rotation: Rotation) -> Self {
        Self::with_loc_and_orientation(Point::zero(), rotation)
    }

    /// Returns a reflection about the x-axis.
    pub fn reflect_vert() -> Self {
        Self::with_loc_and_orientation(Point::zero(), Orientation::new(true, Rotation::R0))
    }

    /// Places the origin at `loc`, after reflecting and rotating as `orientation` says.
    pub fn with_loc_and_orientation(loc: Point, orientation: impl Into<Orientation>) -> Self {
        let o = orientation.into();
        let (cos, sin) = o.rotation.cos_sin();
        // Reflection about x negates the second column.
        let flip = if o.reflect_vert { -1 } else { 1 };
        Self {
            a: [[cos, -sin * flip], [sin, cos * flip]],
            b: [loc.x, loc.y],
        }
    }

    /// Composes two placements: `child` is applied first, then `parent`.
    ///
    /// Not commutative. Reflecting about x and then shifting by (1, 1) takes
    /// (1, 1) to (2, -2); shifting first takes it to (2, 0).
    pub fn cascade(parent: Transformation, child: Transformation) -> Transformation {
        let mut b = matvec(&parent.a, &child.b);
        b[0] += parent.b[0];
        b[1] += parent.b[1];
        let a = matmul(&parent.a, &child.a);
        Self { a, b }
    }

    /// Returns the inverse transformation.
    ///
    /// Manhattan matrices are orthogonal, so the inverse matrix is the transpose.
    pub fn inverse(&self) -> Transformation {
        let a = [[self.a[0][0], self.a[1][0]], [self.a[0][1], self.a[1][1]]];
        let b = matvec(&a, &self.b);
        Self { a, b: [-b[0], -b[1]] }
    }

    /// Returns this transformation followed by a translation of `p`.
    pub fn translated(&self, p: Point) -> Transformation {
        Self {
            a: self.a,
            b: [self.b[0] + p.x, self.b[1] + p.y],
        }
    }

    /// The translation component.
    pub fn offset_point(&self) -> Point {
        Point {
            x: self.b[0],
            y: self.b[1],
        }
    }

    /// The orientation component.
    pub fn orientation(&self) -> Orientation {
        let det = self.a[0][0] * self.a[1][1] - self.a[0][1] * self.a[1][0];
        let cos = self.a[0][0];
        let sin = self.a[1][0];
        let rotation = Rotation::from_unit(Point::new(cos, sin)).unwrap_or_default();
        Orientation {
            reflect_vert: det < 0,
            rotation,
        }
    }

    /// Maps a facing direction through the matrix part of this transformation.
    pub fn apply_dir(&self, dir: Rotation) -> Rotation {
        let u = dir.unit();
        let v = Point::new(
            self.a[0][0] * u.x + self.a[0][1] * u.y,
            self.a[1][0] * u.x + self.a[1][1] * u.y,
        );
        Rotation::from_unit(v).unwrap_or(dir)
    }

    /// Returns `true` if this is the identity transformation.
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

impl<T> From<T> for Transformation
where
    T: Into<Orientation>,
{
    fn from(value: T) -> Self {
        Self::with_loc_and_orientation(Point::zero(), value)
    }
}

fn matmul(a: &[[i64; 2]; 2], b: &[[i64; 2]; 2]) -> [[i64; 2]; 2] {
    [
        [
            a[0][0] * b[0][0] + a[0][1] * b[1][0],
            a[0][0] * b[0][1] + a[0][1] * b[1][1],
        ],
        [
            a[1][0] * b[0][0] + a[1][1] * b[1][0],
            a[1][0] * b[0][1] + a[1][1] * b[1][1],
        ],
    ]
}
fn matvec(a: &[[i64; 2]; 2], b: &[i64; 2]) -> [i64; 2] {
    [
        a[0][0] * b[0] + a[0][1] * b[1],
        a[1][0] * b[0] + a[1][1] * b[1],
    ]
}

/// Objects that can be mapped through a [`Transformation`].
pub trait Transform {
    fn transform(&self, trans: Transformation) -> Self;
}

impl Transform for Point {
    fn transform(&self, trans: Transformation) -> Self {
        let [x, y] = matvec(&trans.a, &[self.x, self.y]);
        Self {
            x: x + trans.b[0],
            y: y + trans.b[1],
        }
    }
}

impl Transform for Rect {
    fn transform(&self, trans: Transformation) -> Self {
        Rect::new(self.p0.transform(trans), self.p1.transform(trans))
    }
}

impl Transform for Polygon {
    fn transform(&self, trans: Transformation) -> Self {
        Polygon {
            points: self.points.iter().map(|p| p.transform(trans)).collect(),
        }
    }
}

impl Transform for Path {
    fn transform(&self, trans: Transformation) -> Self {
        Path {
            points: self.points.iter().map(|p| p.transform(trans)).collect(),
            width: self.width,
        }
    }
}

/// In-place shifting by a [`Point`].
pub trait Translate {
    fn translate(&mut self, p: Point);
}

impl Translate for Point {
    fn translate(&mut self, p: Point) {
        self.x += p.x;
        self.y += p.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::Named;

    #[test]
    fn test_matvec() {
        let a = [[1, 2], [3, 4]];
        let b = [5, 6];
        assert_eq!(matvec(&a, &b), [17, 39]);
    }

    #[test]
    fn test_matmul() {
        let a = [[1, 2], [3, 4]];
        let b = [[5, 6], [7, 8]];
        assert_eq!(matmul(&a, &b), [[19, 22], [43, 50]]);
    }

    #[test]
    fn cascade_identity() {
        for orientation in Named::all_rectangular() {
            let tf = Transformation::with_loc_and_orientation(Point::new(520, 130), orientation);
            let casc = Transformation::cascade(tf, Transformation::identity());
            assert_eq!(
                tf, casc,
                "Cascading with identity produced incorrect transformation for orientation {:?}",
                orientation
            );
        }
    }

    #[test]
    fn cascade_many_identities_is_identity() {
        let composed = (0..64).fold(Transformation::identity(), |acc, _| {
            Transformation::cascade(acc, Transformation::identity())
        });
        assert!(composed.is_identity());
    }

    #[test]
    fn rotate_then_translate_twice_matches_matrix_product() {
        // (R90, t) applied twice: x -> R(Rx + t) + t = R^2 x + Rt + t.
        let t = Point::new(100, 20);
        let step = Transformation::with_loc_and_orientation(t, Named::R90);
        let twice = Transformation::cascade(step, step);

        let r90 = [[0, -1], [1, 0]];
        let rt = matvec(&r90, &[t.x, t.y]);
        let expected = Transformation {
            a: matmul(&r90, &r90),
            b: [rt[0] + t.x, rt[1] + t.y],
        };
        assert_eq!(twice, expected);
        assert_eq!(twice.orientation(), Named::R180.into());
        assert_eq!(twice.offset_point(), Point::new(80, 120));
    }

    #[test]
    fn reflection_example_from_docs() {
        let reflect = Transformation::reflect_vert();
        let shift = Transformation::translate(1, 1);
        let p = Point::new(1, 1);
        assert_eq!(
            p.transform(Transformation::cascade(reflect, shift)),
            Point::new(2, -2)
        );
        assert_eq!(
            p.transform(Transformation::cascade(shift, reflect)),
            Point::new(2, 0)
        );
    }

    #[test]
    fn transformation_loc_and_orientation_components() {
        let pt = Point::new(8930, 730);
        for orientation in Named::all_rectangular() {
            let tf = Transformation::with_loc_and_orientation(pt, orientation);
            assert_eq!(tf.orientation(), orientation.into());
            assert_eq!(tf.offset_point(), pt);
        }
    }

    #[test]
    fn inverse_undoes_every_orientation() {
        let p = Point::new(-37, 911);
        for orientation in Named::all_rectangular() {
            let tf = Transformation::with_loc_and_orientation(Point::new(380, -340), orientation);
            assert_eq!(p.transform(tf).transform(tf.inverse()), p);
            assert!(Transformation::cascade(tf, tf.inverse()).is_identity());
        }
    }

    #[test]
    fn directions_follow_the_matrix() {
        let tf = Transformation::from(Named::R90);
        assert_eq!(tf.apply_dir(Rotation::R0), Rotation::R90);
        let mirror = Transformation::from(Named::M0);
        assert_eq!(mirror.apply_dir(Rotation::R90), Rotation::R270);
        assert_eq!(mirror.apply_dir(Rotation::R180), Rotation::R180);
    }
}
