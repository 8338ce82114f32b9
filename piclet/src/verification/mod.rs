//! Verification plugin API and report classification.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::cell::CellKey;
use crate::layout::library::Library;
use crate::log::{debug, warn};

pub mod connectivity;
pub mod summary;

pub use connectivity::PinConnectivityVerifier;
pub use summary::{ErrorSummary, SummaryRow};

/// Designs narrower or shorter than this (in dbu) are rejected when the
/// verifier itself fails.
pub const MIN_DESIGN_SIZE: i64 = 1_000;

/// Outputs emitted by a [`Verifier`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// The number of violations found.
    pub count: usize,
    /// One human-readable line per violation.
    pub lines: Vec<String>,
}

/// The trait that verification plugins must implement.
pub trait Verifier {
    /// Checks the design rooted at `top`.
    fn verify(&self, lib: &Library, top: CellKey) -> Result<VerificationReport>;
}

/// The categories report lines are sorted into.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    DisconnectedPins,
    FloatingShapes,
    InvalidComponents,
    MissingPins,
    PinErrors,
    OtherErrors,
}

impl ErrorCategory {
    /// Classifies one report line. The first matching rule wins.
    pub fn classify(line: &str) -> Option<Self> {
        let line = line.to_lowercase();
        let has = |s: &str| line.contains(s);
        if has("disconnected pin") {
            Some(Self::DisconnectedPins)
        } else if has("floating shape") {
            Some(Self::FloatingShapes)
        } else if has("invalid component") {
            Some(Self::InvalidComponents)
        } else if has("missing pin") {
            Some(Self::MissingPins)
        } else if has("pin") && (has("error") || has("warning")) {
            Some(Self::PinErrors)
        } else if (has("error") || has("warning") || has("fail"))
            && !["disconnected", "floating", "invalid", "missing"]
                .iter()
                .any(|s| has(s))
        {
            Some(Self::OtherErrors)
        } else {
            None
        }
    }
}

/// Per-category violation counts for one file.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ErrorCounts {
    pub disconnected_pins: usize,
    pub floating_shapes: usize,
    pub invalid_components: usize,
    pub missing_pins: usize,
    pub pin_errors: usize,
    pub other_errors: usize,
    /// Set when the verifier could not run at all.
    pub verification_failed: usize,
}

impl ErrorCounts {
    pub fn add(&mut self, category: ErrorCategory) {
        use ErrorCategory::*;
        match category {
            DisconnectedPins => self.disconnected_pins += 1,
            FloatingShapes => self.floating_shapes += 1,
            InvalidComponents => self.invalid_components += 1,
            MissingPins => self.missing_pins += 1,
            PinErrors => self.pin_errors += 1,
            OtherErrors => self.other_errors += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.disconnected_pins
            + self.floating_shapes
            + self.invalid_components
            + self.missing_pins
            + self.pin_errors
            + self.other_errors
            + self.verification_failed
    }
}

/// Counts the categorized lines of a verification report.
pub fn parse_verification_errors<S: AsRef<str>>(lines: &[S]) -> ErrorCounts {
    let mut counts = ErrorCounts::default();
    for line in lines {
        if let Some(category) = ErrorCategory::classify(line.as_ref()) {
            counts.add(category);
        }
    }
    counts
}

/// The outcome of verifying one submission.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FileStatus {
    /// No violations.
    Passed,
    /// Violations that do not prevent use.
    Warned,
    /// Not used, for the given reason.
    Skipped(String),
}

impl FileStatus {
    /// Checks if the submission may be composed into a PIClet.
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Skipped(_))
    }
}

impl Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Warned => write!(f, "warnings"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
        }
    }
}

/// Runs `verifier` on a submission and decides whether it can be used.
///
/// Any disconnected pin skips the file. If the verifier itself fails, the
/// design is accepted unless its bounding box is implausibly small.
pub fn verify_submission(
    verifier: &dyn Verifier,
    lib: &Library,
    top: CellKey,
) -> (FileStatus, ErrorCounts) {
    let name = lib.cell(top).name();
    match verifier.verify(lib, top) {
        Ok(report) => {
            let counts = parse_verification_errors(&report.lines);
            debug!("{} verification error(s) in {}", report.count, name);
            let status = if counts.disconnected_pins > 0 {
                FileStatus::Skipped("disconnected pins".to_string())
            } else if counts.total() > 0 || report.count > 0 {
                FileStatus::Warned
            } else {
                FileStatus::Passed
            };
            (status, counts)
        }
        Err(err) => {
            warn!("verification of {} failed, checking bounding box: {}", name, err);
            let counts = ErrorCounts {
                verification_failed: 1,
                ..Default::default()
            };
            let bbox = lib.bbox(top);
            if bbox.width() < MIN_DESIGN_SIZE || bbox.height() < MIN_DESIGN_SIZE {
                (FileStatus::Skipped("cell too small".to_string()), counts)
            } else {
                (FileStatus::Warned, counts)
            }
        }
    }
}
