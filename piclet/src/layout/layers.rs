//! Utilities and types for managing technology layers.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ErrorSource, Result};

/// A GDS layer specification: layer number and datatype.
#[derive(
    Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct LayerSpec(pub i16, pub i16);

impl LayerSpec {
    #[inline]
    pub fn layer(&self) -> i16 {
        self.0
    }
    #[inline]
    pub fn datatype(&self) -> i16 {
        self.1
    }
}

impl Display for LayerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0, self.1)
    }
}

impl From<gds21::GdsLayerSpec> for LayerSpec {
    fn from(other: gds21::GdsLayerSpec) -> Self {
        Self(other.layer, other.xtype)
    }
}

#[allow(clippy::from_over_into)]
impl Into<gds21::GdsLayerSpec> for LayerSpec {
    fn into(self) -> gds21::GdsLayerSpec {
        gds21::GdsLayerSpec {
            layer: self.0,
            xtype: self.1,
        }
    }
}

/// The roles a technology layer can play during composition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LayerRole {
    /// Optical waveguide core.
    Waveguide,
    /// Pin recognition markers.
    PinRec,
    /// Device recognition outlines.
    DevRec,
    FloorPlan,
    KeepOut,
    /// Routing metal between bond pads and devices.
    Metal,
    Heater,
    DeepTrench,
    Text,
}

impl LayerRole {
    fn code(&self) -> &'static str {
        match self {
            Self::Waveguide => "waveguide",
            Self::PinRec => "pinrec",
            Self::DevRec => "devrec",
            Self::FloorPlan => "floorplan",
            Self::KeepOut => "keepout",
            Self::Metal => "metal",
            Self::Heater => "heater",
            Self::DeepTrench => "trench",
            Self::Text => "text",
        }
    }

    fn all() -> impl Iterator<Item = LayerRole> {
        [
            Self::Waveguide,
            Self::PinRec,
            Self::DevRec,
            Self::FloorPlan,
            Self::KeepOut,
            Self::Metal,
            Self::Heater,
            Self::DeepTrench,
            Self::Text,
        ]
        .into_iter()
    }
}

impl Display for LayerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Error)]
#[error("unknown layer role: {0}")]
pub struct FromStrError(String);

impl FromStr for LayerRole {
    type Err = FromStrError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::all()
            .find(|r| r.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FromStrError(s.to_string()))
    }
}

#[derive(Deserialize)]
struct CsvLayerRecord {
    layernum: i16,
    datatype: i16,
    name: String,
    #[serde(default)]
    role: String,
}

/// A technology layer table.
///
/// Indexes layers by name, and by the [`LayerRole`] they fill.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layers {
    names: HashMap<ArcStr, LayerSpec>,
    roles: HashMap<LayerRole, LayerSpec>,
}

impl Layers {
    /// Creates an empty [`Layers`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a [`Layers`] from a CSV table with columns `layernum,datatype,name,role`.
    ///
    /// The `role` column may be empty.
    pub fn from_csv(csv: &str) -> std::result::Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(csv.as_bytes());
        let mut layers = Self::new();
        for record in reader.deserialize() {
            let record: CsvLayerRecord = record?;
            let spec = LayerSpec(record.layernum, record.datatype);
            let role = if record.role.is_empty() {
                None
            } else {
                LayerRole::from_str(&record.role).ok()
            };
            layers.add(record.name, spec, role);
        }
        Ok(layers)
    }

    /// Adds a named layer, optionally filling `role`.
    pub fn add(&mut self, name: impl Into<ArcStr>, spec: LayerSpec, role: Option<LayerRole>) {
        self.names.insert(name.into(), spec);
        if let Some(role) = role {
            self.roles.insert(role, spec);
        }
    }

    /// Looks up a layer by technology name.
    pub fn get(&self, name: &str) -> Option<LayerSpec> {
        self.names.get(name).copied()
    }

    /// Looks up the layer that fills `role`.
    pub fn role(&self, role: LayerRole) -> Result<LayerSpec> {
        self.roles
            .get(&role)
            .copied()
            .ok_or_else(|| ErrorSource::LayerNotFound(role.to_string()).into())
    }

    /// Returns the name of the layer with the given spec, if any.
    pub fn name_of(&self, spec: LayerSpec) -> Option<&ArcStr> {
        self.names
            .iter()
            .find(|(_, s)| **s == spec)
            .map(|(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layers_from_csv() {
        let csv = "layernum,datatype,name,role\n4,0,SiN,waveguide\n1,10,PinRec,pinrec\n81,0,Extra,\n";
        let layers = Layers::from_csv(csv).unwrap();
        assert_eq!(layers.role(LayerRole::Waveguide).unwrap(), LayerSpec(4, 0));
        assert_eq!(layers.get("PinRec"), Some(LayerSpec(1, 10)));
        assert_eq!(layers.get("Extra"), Some(LayerSpec(81, 0)));
        assert!(layers.role(LayerRole::DevRec).is_err());
    }
}
