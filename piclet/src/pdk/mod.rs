//! Component library plugin API.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::cell::CellKey;
use crate::layout::layers::Layers;
use crate::layout::library::Library;
use crate::layout::routing::WaveguideSpec;

/// Parameters passed to [`ComponentLibrary::component`].
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ComponentParams {
    /// Operating wavelength in nanometers.
    pub wavelength: u32,
}

impl Default for ComponentParams {
    fn default() -> Self {
        Self { wavelength: 1310 }
    }
}

/// A photonic component library.
///
/// Implementations draw named components into a [`Library`], each carrying
/// its pins, and describe the waveguide cross-section to route with.
pub trait ComponentLibrary {
    /// The library name.
    fn name(&self) -> &'static str;

    /// The technology (process) name.
    fn technology(&self) -> &'static str;

    /// The layer table of the technology.
    fn layers(&self) -> Layers;

    /// Returns the cell for component `name`, creating it in `lib` if needed.
    ///
    /// Unknown components are reported as [`ErrorSource::ComponentNotFound`](crate::error::ErrorSource::ComponentNotFound).
    fn component(&self, lib: &mut Library, name: &str, params: &ComponentParams)
        -> Result<CellKey>;

    /// The waveguide cross-section used at `wavelength` nanometers.
    fn waveguide(&self, wavelength: u32) -> WaveguideSpec;
}

/// Builds the [`ErrorSource::ComponentNotFound`](crate::error::ErrorSource::ComponentNotFound) error for `library`.
pub fn component_not_found(library: &str, name: &str) -> crate::error::PicletError {
    crate::error::ErrorSource::ComponentNotFound {
        library: ArcStr::from(library),
        name: ArcStr::from(name),
    }
    .into()
}
