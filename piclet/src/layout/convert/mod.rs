//! Conversion to and from external layout formats.

pub mod error;
pub mod gds;
pub mod json;
