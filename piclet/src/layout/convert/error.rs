//! Error reporting shared by the layout converters.

use std::fmt::Display;

use arcstr::ArcStr;

/// One step of a converter's walk through a layout, recorded so failures can
/// say where they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Library,
    Units,
    Cell(ArcStr),
    Instance(ArcStr),
    Array(ArcStr),
    Geometry,
    Annotations,
    Pins,
}

impl Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Library => write!(f, "library"),
            Self::Units => write!(f, "units"),
            Self::Cell(name) => write!(f, "cell {name}"),
            Self::Instance(name) => write!(f, "instance of {name}"),
            Self::Array(name) => write!(f, "array of {name}"),
            Self::Geometry => write!(f, "geometry"),
            Self::Annotations => write!(f, "annotations"),
            Self::Pins => write!(f, "pins"),
        }
    }
}

/// Formats a converter backtrace, outermost frame first.
pub fn format_frames(frames: &[Frame]) -> String {
    frames
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" > ")
}

/// Failure helpers for converters that track a [`Frame`] stack.
pub trait ConvErrors {
    type Error;

    /// Wraps `msg` together with the converter's current position.
    fn err(&self, msg: impl Into<String>) -> Self::Error;

    fn fail<T>(&self, msg: impl Into<String>) -> Result<T, Self::Error> {
        Err(self.err(msg))
    }

    /// Returns the value in `opt`, or fails with `msg`.
    fn require<T>(&self, opt: Option<T>, msg: impl Into<String>) -> Result<T, Self::Error> {
        opt.ok_or_else(|| self.err(msg))
    }

    fn ensure(&self, cond: bool, msg: impl Into<String>) -> Result<(), Self::Error> {
        if cond {
            Ok(())
        } else {
            self.fail(msg)
        }
    }
}
