//! Stand-in cells for the SiEPIC EBeam SiN component library.
//!
//! Components are drawn as simple outlines, but carry the same names and
//! pins as the real library cells, which is all composition relies on.

use arcstr::ArcStr;
use piclet::error::Result;
use piclet::layout::cell::CellKey;
use piclet::layout::layers::Layers;
use piclet::layout::library::Library;
use piclet::layout::routing::WaveguideSpec;
use piclet::pdk::{component_not_found, ComponentLibrary, ComponentParams};
use piclet::piclet::laser_name;

pub mod components;
pub mod layers;

/// Grating coupler used by student designs.
pub const GRATING_COUPLER: &str = "ebeam_GC_SiN_1310";
/// Port marker students place where the laser should feed their design.
pub const PORT_MARKER: &str = "port_SiN_800";
pub const FAML: &str = "ebeam_dream_FaML_Shuksan_SiN_1310_BB";

/// Wavelengths with a laser and waveguide definition.
pub const WAVELENGTHS: [u32; 2] = [1310, 1550];

#[derive(Debug, Clone)]
pub struct EbeamPdk {
    layers: Layers,
}

impl Default for EbeamPdk {
    fn default() -> Self {
        Self::new()
    }
}

impl EbeamPdk {
    pub fn new() -> Self {
        Self {
            layers: Self::layer_table(),
        }
    }
}

impl ComponentLibrary for EbeamPdk {
    fn name(&self) -> &'static str {
        "EBeam-SiN"
    }

    fn technology(&self) -> &'static str {
        "SiEPICfab_EBeam_ZEP"
    }

    fn layers(&self) -> Layers {
        self.layers.clone()
    }

    fn component(
        &self,
        lib: &mut Library,
        name: &str,
        params: &ComponentParams,
    ) -> Result<CellKey> {
        if let Some(key) = lib.cell_by_name(name) {
            return Ok(key);
        }
        let draw = components::drawer(name)
            .filter(|_| !name.contains("Laser") || name == laser_name(params.wavelength))
            .ok_or_else(|| component_not_found(self.name(), name))?;
        let key = lib.create_cell(name);
        draw(&mut components::Canvas::new(lib, key, &self.layers)?);
        Ok(key)
    }

    fn waveguide(&self, wavelength: u32) -> WaveguideSpec {
        WaveguideSpec {
            name: ArcStr::from(format!("SiN Strip TE {wavelength} nm, w=800 nm")),
            width: components::WG_WIDTH,
            radius: 60_000,
        }
    }
}
