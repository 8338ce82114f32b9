//! Hierarchical layout database and the algorithms that compose designs.

use std::path::Path;

use crate::error::{ErrorSource, Result};

pub mod cell;
pub mod convert;
pub mod error;
pub mod hierarchy;
pub mod layers;
pub mod library;
pub mod reference;
pub mod routing;

use layers::Layers;
use library::Library;

/// Layout file formats recognized as submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutFormat {
    Gds,
    Json,
    /// OASIS files are recognized but cannot be read.
    Oasis,
}

impl LayoutFormat {
    /// Determines the format from a file extension, ignoring case.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "gds" | "gds2" | "gdsii" => Some(Self::Gds),
            "json" => Some(Self::Json),
            "oas" | "oasis" => Some(Self::Oasis),
            _ => None,
        }
    }
}

impl Library {
    /// Reads a layout file, choosing the reader by extension.
    pub fn load(path: impl AsRef<Path>, layers: &Layers) -> Result<Library> {
        let path = path.as_ref();
        match LayoutFormat::from_path(path) {
            Some(LayoutFormat::Gds) => Library::from_gds(path, layers),
            Some(LayoutFormat::Json) => Library::load_json(path),
            Some(LayoutFormat::Oasis) => {
                Err(ErrorSource::UnsupportedFormat("OASIS".to_string()).into())
            }
            None => Err(ErrorSource::UnsupportedFormat(path.display().to_string()).into()),
        }
    }
}
