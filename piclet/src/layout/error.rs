//! Layout result and error types.

use arcstr::ArcStr;
use thiserror::Error;

use super::convert::error::{format_frames, Frame};

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("export failed: {message} (in {})", format_frames(.stack))]
    Export { message: String, stack: Vec<Frame> },

    #[error("import failed: {message} (in {})", format_frames(.stack))]
    Import { message: String, stack: Vec<Frame> },

    /// A cell on the way to an ancestor is placed more than once, so the
    /// ancestor is not well defined.
    #[error("cell {cell} has {placements} placements; cannot move an instance through it")]
    AmbiguousHierarchy { cell: ArcStr, placements: usize },

    #[error("cell {cell} at level {level} has no parent")]
    HierarchyExhausted { cell: ArcStr, level: usize },

    #[error("instance not found in cell {0}")]
    InstanceNotFound(ArcStr),

    #[error("pin {pin} not found in cell {cell}")]
    PinNotFound { cell: ArcStr, pin: ArcStr },

    #[error(transparent)]
    Boxed(Box<dyn std::error::Error + Send + Sync>),

    #[error("{0}")]
    Str(String),
}

pub type LayoutResult<T> = Result<T, LayoutError>;

impl LayoutError {
    pub fn msg(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    pub fn fail<T>(s: impl Into<String>) -> LayoutResult<T> {
        Err(Self::msg(s))
    }
}

impl From<std::num::TryFromIntError> for LayoutError {
    fn from(e: std::num::TryFromIntError) -> Self {
        Self::Boxed(Box::new(e))
    }
}

impl From<gds21::GdsError> for LayoutError {
    fn from(e: gds21::GdsError) -> Self {
        Self::Boxed(Box::new(e))
    }
}
