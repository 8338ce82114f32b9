//! A built-in verifier checking that every optical pin is connected.

use arcstr::ArcStr;
use picgeom::transform::Transform;
use picgeom::Point;

use super::{VerificationReport, Verifier};
use crate::error::Result;
use crate::layout::cell::{CellKey, Pin};
use crate::layout::layers::LayerSpec;
use crate::layout::library::Library;

/// Reports pins of placed components that are neither joined to another pin
/// nor touched by a waveguide endpoint.
///
/// Pins on the top cell itself are the design's external ports and are not checked.
#[derive(Debug, Clone, Copy)]
pub struct PinConnectivityVerifier {
    waveguide: LayerSpec,
}

impl PinConnectivityVerifier {
    pub fn new(waveguide: LayerSpec) -> Self {
        Self { waveguide }
    }
}

impl Verifier for PinConnectivityVerifier {
    fn verify(&self, lib: &Library, top: CellKey) -> Result<VerificationReport> {
        let mut pins: Vec<(Pin, ArcStr)> = Vec::new();
        let mut endpoints: Vec<Point> = Vec::new();
        let mut empty = true;
        lib.walk(top, |cell, trans| {
            if cell.elems().next().is_some() || cell.insts().next().is_some() {
                empty = false;
            }
            for elem in cell.elems().filter(|e| e.layer == self.waveguide) {
                if let Some((p0, p1)) = elem.inner.as_path().and_then(|p| p.endpoints()) {
                    endpoints.push(p0.transform(trans));
                    endpoints.push(p1.transform(trans));
                }
            }
            if cell.id() != top {
                for pin in cell.pins() {
                    pins.push((pin.transform(trans), cell.name().clone()));
                }
            }
        });

        let mut report = VerificationReport::default();
        if empty {
            report.lines.push("Error: empty design".to_string());
        }
        for (i, (pin, owner)) in pins.iter().enumerate() {
            let mated = pins.iter().enumerate().any(|(j, (other, _))| {
                i != j && other.loc == pin.loc && other.dir == pin.dir.opposite()
            });
            if !mated && !endpoints.contains(&pin.loc) {
                report.lines.push(format!(
                    "Disconnected pin '{}' on {} at ({}, {})",
                    pin.name, owner, pin.loc.x, pin.loc.y
                ));
            }
        }
        report.count = report.lines.len();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use picgeom::orientation::Rotation;
    use picgeom::{Path, Rect};

    use super::*;
    use crate::verification::{parse_verification_errors, ErrorCategory};

    const WG: LayerSpec = LayerSpec(4, 0);

    fn component(lib: &mut Library, name: &str) -> CellKey {
        let key = lib.create_cell(name);
        let cell = lib.cell_mut(key);
        cell.draw(WG, Rect::new(Point::new(0, -500), Point::new(10_000, 500)));
        cell.add_pin(Pin::new("opt1", Point::new(0, 0), Rotation::R180, 800));
        cell.add_pin(Pin::new("opt2", Point::new(10_000, 0), Rotation::R0, 800));
        key
    }

    #[test]
    fn abutted_and_routed_pins_are_connected() {
        let mut lib = Library::new("test");
        let wg = component(&mut lib, "straight");
        let top = lib.create_cell("top");
        lib.place(top, wg, Point::zero(), Rotation::R0);
        lib.place(top, wg, Point::new(10_000, 0), Rotation::R0);
        lib.place(top, wg, Point::new(50_000, 0), Rotation::R0);
        lib.cell_mut(top).draw(
            WG,
            Path::new(vec![Point::new(20_000, 0), Point::new(50_000, 0)], 800),
        );
        lib.cell_mut(top).draw(
            WG,
            Path::new(vec![Point::new(-5_000, 0), Point::new(0, 0)], 800),
        );
        lib.cell_mut(top).draw(
            WG,
            Path::new(vec![Point::new(60_000, 0), Point::new(70_000, 0)], 800),
        );

        let report = PinConnectivityVerifier::new(WG).verify(&lib, top).unwrap();
        assert_eq!(report.count, 0, "{:?}", report.lines);
    }

    #[test]
    fn dangling_pin_is_reported() {
        let mut lib = Library::new("test");
        let wg = component(&mut lib, "straight");
        let top = lib.create_cell("top");
        lib.place(top, wg, Point::new(100, 200), Rotation::R0);

        let report = PinConnectivityVerifier::new(WG).verify(&lib, top).unwrap();
        assert_eq!(report.count, 2);
        assert_eq!(
            report.lines[0],
            "Disconnected pin 'opt1' on straight at (100, 200)"
        );
        let counts = parse_verification_errors(&report.lines);
        assert_eq!(counts.disconnected_pins, 2);
        assert_eq!(
            ErrorCategory::classify(&report.lines[1]),
            Some(ErrorCategory::DisconnectedPins)
        );
    }

    #[test]
    fn empty_design_is_an_error() {
        let mut lib = Library::new("test");
        let top = lib.create_cell("top");
        let report = PinConnectivityVerifier::new(WG).verify(&lib, top).unwrap();
        assert_eq!(report.lines, vec!["Error: empty design".to_string()]);
    }
}
