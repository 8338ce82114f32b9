//! Manhattan orientations: quarter-turn rotations with an optional mirror.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Point;

/// A counter-clockwise rotation by a multiple of 90 degrees.
///
/// Also used as a facing direction: [`Rotation::R0`] faces +x,
/// [`Rotation::R90`] faces +y, and so on.
#[derive(
    Debug, Default, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Creates a rotation from a (possibly negative) number of quarter turns.
    pub fn from_quarter_turns(turns: i64) -> Self {
        match turns.rem_euclid(4) {
            0 => Self::R0,
            1 => Self::R90,
            2 => Self::R180,
            _ => Self::R270,
        }
    }

    /// Creates a rotation from an angle in degrees.
    ///
    /// Returns [`None`] if `degrees` is not a multiple of 90.
    pub fn from_degrees(degrees: f64) -> Option<Self> {
        let turns = degrees / 90.;
        if (turns - turns.round()).abs() > 1e-9 {
            return None;
        }
        Some(Self::from_quarter_turns(turns.round() as i64))
    }

    /// Recovers the direction of a unit-length axis-aligned vector.
    pub fn from_unit(v: Point) -> Option<Self> {
        match (v.x, v.y) {
            (1, 0) => Some(Self::R0),
            (0, 1) => Some(Self::R90),
            (-1, 0) => Some(Self::R180),
            (0, -1) => Some(Self::R270),
            _ => None,
        }
    }

    /// Recovers the direction of an arbitrary-length axis-aligned vector.
    pub fn from_vector(v: Point) -> Option<Self> {
        Self::from_unit(Point::new(v.x.signum(), v.y.signum()))
    }

    #[inline]
    pub fn quarter_turns(&self) -> i64 {
        match self {
            Self::R0 => 0,
            Self::R90 => 1,
            Self::R180 => 2,
            Self::R270 => 3,
        }
    }

    #[inline]
    pub fn degrees(&self) -> f64 {
        (self.quarter_turns() * 90) as f64
    }

    /// The direction pointing the other way.
    pub fn opposite(&self) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + 2)
    }

    /// The unit vector pointing in this direction.
    pub fn unit(&self) -> Point {
        match self {
            Self::R0 => Point::new(1, 0),
            Self::R90 => Point::new(0, 1),
            Self::R180 => Point::new(-1, 0),
            Self::R270 => Point::new(0, -1),
        }
    }

    /// Returns the `(cos, sin)` pair of this rotation.
    pub(crate) fn cos_sin(&self) -> (i64, i64) {
        let u = self.unit();
        (u.x, u.y)
    }
}

impl std::ops::Add for Rotation {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::from_quarter_turns(self.quarter_turns() + rhs.quarter_turns())
    }
}

impl std::ops::Sub for Rotation {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::from_quarter_turns(self.quarter_turns() - rhs.quarter_turns())
    }
}

impl Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.quarter_turns() * 90)
    }
}

/// An orientation: an optional reflection about the x-axis, followed by a rotation.
#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Orientation {
    /// Reflect vertically (about the x-axis) before rotating.
    pub reflect_vert: bool,
    pub rotation: Rotation,
}

impl Orientation {
    pub fn new(reflect_vert: bool, rotation: Rotation) -> Self {
        Self {
            reflect_vert,
            rotation,
        }
    }

    /// Rotates by an additional 90 degrees counter-clockwise.
    pub fn r90(&mut self) {
        self.rotation = self.rotation + Rotation::R90;
    }

    /// Reflects about the x-axis, after whatever is already applied.
    pub fn reflect_vert(&mut self) {
        self.reflect_vert = !self.reflect_vert;
        self.rotation = Rotation::from_quarter_turns(-self.rotation.quarter_turns());
    }
}

impl From<Rotation> for Orientation {
    fn from(rotation: Rotation) -> Self {
        Self {
            reflect_vert: false,
            rotation,
        }
    }
}

/// Named orientations, using the conventional `R`/`M` codes.
///
/// `M<angle>` denotes a mirror about the line through the origin at `angle` degrees.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Named {
    R0,
    R90,
    R180,
    R270,
    M0,
    M45,
    M90,
    M135,
}

impl Named {
    /// All eight Manhattan orientations.
    pub fn all_rectangular() -> impl Iterator<Item = Named> {
        [
            Self::R0,
            Self::R90,
            Self::R180,
            Self::R270,
            Self::M0,
            Self::M45,
            Self::M90,
            Self::M135,
        ]
        .into_iter()
    }

    fn code(&self) -> &'static str {
        match self {
            Self::R0 => "R0",
            Self::R90 => "R90",
            Self::R180 => "R180",
            Self::R270 => "R270",
            Self::M0 => "M0",
            Self::M45 => "M45",
            Self::M90 => "M90",
            Self::M135 => "M135",
        }
    }
}

impl From<Named> for Orientation {
    fn from(value: Named) -> Self {
        use Rotation::*;
        match value {
            Named::R0 => Orientation::new(false, R0),
            Named::R90 => Orientation::new(false, R90),
            Named::R180 => Orientation::new(false, R180),
            Named::R270 => Orientation::new(false, R270),
            Named::M0 => Orientation::new(true, R0),
            Named::M45 => Orientation::new(true, R90),
            Named::M90 => Orientation::new(true, R180),
            Named::M135 => Orientation::new(true, R270),
        }
    }
}

impl Display for Named {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("invalid orientation code: {0}")]
pub struct OrientationParseError(String);

impl FromStr for Named {
    type Err = OrientationParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all_rectangular()
            .find(|n| n.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| OrientationParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_arithmetic_wraps() {
        assert_eq!(Rotation::R270 + Rotation::R180, Rotation::R90);
        assert_eq!(Rotation::R0 - Rotation::R90, Rotation::R270);
        assert_eq!(Rotation::R90.opposite(), Rotation::R270);
        assert_eq!(Rotation::from_degrees(-90.), Some(Rotation::R270));
        assert_eq!(Rotation::from_degrees(45.), None);
    }

    #[test]
    fn named_codes_round_trip() {
        for named in Named::all_rectangular() {
            assert_eq!(named.to_string().parse::<Named>(), Ok(named));
        }
        assert!("R45".parse::<Named>().is_err());
    }
}
