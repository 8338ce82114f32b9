//! Component outlines and pins.

use picgeom::orientation::Rotation;
use picgeom::{Path, Point, Rect};
use piclet::error::Result;
use piclet::layout::cell::{CellKey, Pin};
use piclet::layout::layers::{LayerRole, LayerSpec, Layers};
use piclet::layout::library::Library;
use piclet::piclet::{laser_name, BOND_PAD, HEATER, Y_BRANCH};

use crate::{FAML, GRATING_COUPLER, PORT_MARKER, WAVELENGTHS};

pub const WG_WIDTH: i64 = 800;

pub const LASER_LENGTH: i64 = 700_000;
pub const LASER_HEIGHT: i64 = 300_000;
pub const HEATER_LENGTH: i64 = 500_000;
pub const HEATER_METAL_WIDTH: i64 = 5_000;
pub const PAD_SIZE: i64 = 100_000;
pub const Y_BRANCH_LENGTH: i64 = 15_000;
pub const Y_BRANCH_SPLIT: i64 = 2_750;
pub const FAML_LENGTH: i64 = 60_000;

/// Draws into one component cell.
pub struct Canvas<'a> {
    lib: &'a mut Library,
    key: CellKey,
    waveguide: LayerSpec,
    devrec: LayerSpec,
    metal: LayerSpec,
    heater: LayerSpec,
}

impl<'a> Canvas<'a> {
    pub fn new(lib: &'a mut Library, key: CellKey, layers: &Layers) -> Result<Self> {
        Ok(Self {
            lib,
            key,
            waveguide: layers.role(LayerRole::Waveguide)?,
            devrec: layers.role(LayerRole::DevRec)?,
            metal: layers.role(LayerRole::Metal)?,
            heater: layers.role(LayerRole::Heater)?,
        })
    }

    fn rect(&mut self, layer: LayerSpec, p0: (i64, i64), p1: (i64, i64)) {
        self.lib
            .cell_mut(self.key)
            .draw(layer, Rect::new(p0.into(), p1.into()));
    }

    fn waveguide(&mut self, points: &[(i64, i64)]) {
        let points = points.iter().map(|p| Point::from(*p)).collect();
        self.lib
            .cell_mut(self.key)
            .draw(self.waveguide, Path::new(points, WG_WIDTH));
    }

    fn devrec(&mut self, p0: (i64, i64), p1: (i64, i64)) {
        self.rect(self.devrec, p0, p1);
    }

    fn pin(&mut self, name: &str, loc: (i64, i64), dir: Rotation, width: i64) {
        self.lib
            .cell_mut(self.key)
            .add_pin(Pin::new(name, loc.into(), dir, width));
    }
}

/// The drawing routine for component `name`.
pub fn drawer(name: &str) -> Option<fn(&mut Canvas)> {
    let drawer: fn(&mut Canvas) = match name {
        HEATER => heater,
        BOND_PAD => bond_pad,
        Y_BRANCH => y_branch,
        FAML => faml,
        GRATING_COUPLER => grating_coupler,
        PORT_MARKER => port_marker,
        _ if WAVELENGTHS.iter().any(|w| name == laser_name(*w)) => laser,
        _ => return None,
    };
    Some(drawer)
}

/// Bonded laser chip; emits from `opt1` on its right edge.
fn laser(c: &mut Canvas) {
    let h = LASER_HEIGHT / 2;
    c.devrec((0, -h), (LASER_LENGTH, h));
    c.rect(c.metal, (50_000, -100_000), (LASER_LENGTH - 50_000, 100_000));
    c.waveguide(&[(LASER_LENGTH - 20_000, 0), (LASER_LENGTH, 0)]);
    c.pin("opt1", (LASER_LENGTH, 0), Rotation::R0, WG_WIDTH);
}

/// Waveguide under a resistive heater strip, with a contact at each end.
fn heater(c: &mut Canvas) {
    let mh = HEATER_METAL_WIDTH / 2;
    let contact = 10_000;
    c.devrec((0, -15_000), (HEATER_LENGTH, 15_000));
    c.waveguide(&[(0, 0), (HEATER_LENGTH, 0)]);
    c.rect(c.heater, (0, -mh), (HEATER_LENGTH, mh));
    c.rect(c.metal, (0, -contact), (2 * contact, contact));
    c.rect(
        c.metal,
        (HEATER_LENGTH - 2 * contact, -contact),
        (HEATER_LENGTH, contact),
    );
    c.pin("opt1", (0, 0), Rotation::R180, WG_WIDTH);
    c.pin("opt2", (HEATER_LENGTH, 0), Rotation::R0, WG_WIDTH);
    c.pin("elec1", (contact, 0), Rotation::R90, 2 * contact);
    c.pin("elec2", (HEATER_LENGTH - contact, 0), Rotation::R90, 2 * contact);
}

fn bond_pad(c: &mut Canvas) {
    let h = PAD_SIZE / 2;
    c.devrec((-h, -h), (h, h));
    c.rect(c.metal, (-h, -h), (h, h));
    c.pin("m_pin_left", (-h, 0), Rotation::R180, 20_000);
    c.pin("m_pin_right", (h, 0), Rotation::R0, 20_000);
}

/// 1x2 splitter: input `opt1`, upper output `opt2`, lower output `opt3`.
fn y_branch(c: &mut Canvas) {
    let (l, d) = (Y_BRANCH_LENGTH, Y_BRANCH_SPLIT);
    c.devrec((0, -d - 1_000), (l, d + 1_000));
    c.waveguide(&[(0, 0), (l / 2, 0), (l / 2, d), (l, d)]);
    c.waveguide(&[(l / 2, 0), (l / 2, -d), (l, -d)]);
    c.pin("opt1", (0, 0), Rotation::R180, WG_WIDTH);
    c.pin("opt2", (l, d), Rotation::R0, WG_WIDTH);
    c.pin("opt3", (l, -d), Rotation::R0, WG_WIDTH);
}

/// Facet-attached micro-lens. The origin sits on the facet; `opt1` faces away from it.
fn faml(c: &mut Canvas) {
    c.devrec((0, -20_000), (FAML_LENGTH, 20_000));
    c.waveguide(&[(0, 0), (FAML_LENGTH, 0)]);
    c.pin("opt1", (FAML_LENGTH, 0), Rotation::R0, WG_WIDTH);
}

/// Grating coupler with `opt1` at the origin, grating to the left.
fn grating_coupler(c: &mut Canvas) {
    c.devrec((-30_000, -10_000), (0, 10_000));
    c.rect(c.waveguide, (-25_000, -6_000), (-5_000, 6_000));
    c.waveguide(&[(-5_000, 0), (0, 0)]);
    c.pin("opt1", (0, 0), Rotation::R0, WG_WIDTH);
}

fn port_marker(c: &mut Canvas) {
    c.devrec((0, -WG_WIDTH / 2), (WG_WIDTH, WG_WIDTH / 2));
}
