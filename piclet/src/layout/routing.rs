//! Waveguide routing between pins.

use arcstr::ArcStr;
use picgeom::{Path, Point};
use serde::{Deserialize, Serialize};

use super::cell::{CellKey, Pin};
use super::error::LayoutResult;
use super::layers::LayerSpec;
use super::library::Library;

/// Cross-section of a waveguide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveguideSpec {
    pub name: ArcStr,
    /// Core width.
    pub width: i64,
    /// Minimum bend radius.
    pub radius: i64,
}

/// Draws a waveguide between two pins.
///
/// Both pins are given in the frame of `cell`, and the waveguide is drawn into `cell`.
pub trait WaveguideRouter {
    fn route(
        &self,
        lib: &mut Library,
        cell: CellKey,
        from: &Pin,
        to: &Pin,
        spec: &WaveguideSpec,
    ) -> LayoutResult<()>;
}

/// Routes with at most three axis-aligned segments.
///
/// Pins sharing a coordinate are joined by a straight segment; all others by
/// horizontal, vertical, and horizontal runs meeting at the midpoint x.
#[derive(Debug, Clone, Copy)]
pub struct ManhattanRouter {
    layer: LayerSpec,
}

impl ManhattanRouter {
    pub fn new(layer: LayerSpec) -> Self {
        Self { layer }
    }

    /// The centerline joining `from` and `to`.
    pub fn centerline(from: Point, to: Point) -> Vec<Point> {
        if from.x == to.x || from.y == to.y {
            vec![from, to]
        } else {
            let mid = (from.x + to.x) / 2;
            vec![from, Point::new(mid, from.y), Point::new(mid, to.y), to]
        }
    }
}

impl WaveguideRouter for ManhattanRouter {
    fn route(
        &self,
        lib: &mut Library,
        cell: CellKey,
        from: &Pin,
        to: &Pin,
        spec: &WaveguideSpec,
    ) -> LayoutResult<()> {
        if from.loc == to.loc {
            return Ok(());
        }
        let points = Self::centerline(from.loc, to.loc);
        lib.cell_mut(cell)
            .draw(self.layer, Path::new(points, spec.width));
        Ok(())
    }
}
