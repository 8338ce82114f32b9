//! The per-file verification summary printed at the end of a batch.

use std::fmt::Display;
use std::path::Path;

use serde::Serialize;

use super::{ErrorCounts, FileStatus};
use crate::error::{with_err_context, ErrorContext, Result};
use crate::log::Log;

/// One submission's line in the summary.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SummaryRow {
    pub file: String,
    pub status: FileStatus,
    pub counts: ErrorCounts,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    file: &'a str,
    status: String,
    disconnected_pins: usize,
    floating_shapes: usize,
    invalid_components: usize,
    missing_pins: usize,
    pin_errors: usize,
    other_errors: usize,
    verification_failed: usize,
    total: usize,
}

/// Verification results for every file of a batch, in processing order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ErrorSummary {
    rows: Vec<SummaryRow>,
}

impl ErrorSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: impl Into<String>, status: FileStatus, counts: ErrorCounts) {
        self.rows.push(SummaryRow {
            file: file.into(),
            status,
            counts,
        });
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn row(&self, file: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|r| r.file == file)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SummaryRow> {
        self.rows.iter().filter(|r| !r.status.is_accepted())
    }

    /// Writes the summary as CSV, one row per file.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let inner = || -> Result<()> {
            let mut writer = csv::Writer::from_path(path)?;
            for row in self.rows.iter() {
                let c = &row.counts;
                writer.serialize(CsvRow {
                    file: &row.file,
                    status: row.status.to_string(),
                    disconnected_pins: c.disconnected_pins,
                    floating_shapes: c.floating_shapes,
                    invalid_components: c.invalid_components,
                    missing_pins: c.missing_pins,
                    pin_errors: c.pin_errors,
                    other_errors: c.other_errors,
                    verification_failed: c.verification_failed,
                    total: c.total(),
                })?;
            }
            writer.flush()?;
            Ok(())
        };
        with_err_context(inner(), || ErrorContext::CreateFile(path.to_path_buf()))
    }
}

const HEADERS: [&str; 9] = [
    "file",
    "status",
    "disconnected",
    "floating",
    "invalid",
    "missing",
    "pin",
    "other",
    "failed",
];

impl Display for ErrorSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cells: Vec<[String; 9]> = self
            .rows
            .iter()
            .map(|r| {
                let c = &r.counts;
                [
                    r.file.clone(),
                    r.status.to_string(),
                    c.disconnected_pins.to_string(),
                    c.floating_shapes.to_string(),
                    c.invalid_components.to_string(),
                    c.missing_pins.to_string(),
                    c.pin_errors.to_string(),
                    c.other_errors.to_string(),
                    c.verification_failed.to_string(),
                ]
            })
            .collect();
        let mut widths = HEADERS.map(str::len);
        for row in cells.iter() {
            for (w, cell) in widths.iter_mut().zip(row.iter()) {
                *w = (*w).max(cell.len());
            }
        }

        let line = |f: &mut std::fmt::Formatter<'_>, row: &[&str]| -> std::fmt::Result {
            for (i, (cell, w)) in row.iter().zip(widths.iter()).enumerate() {
                if i > 0 {
                    write!(f, "  ")?;
                }
                if i < 2 {
                    write!(f, "{cell:<w$}")?;
                } else {
                    write!(f, "{cell:>w$}")?;
                }
            }
            writeln!(f)
        };
        line(f, &HEADERS)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        line(f, &rule.iter().map(String::as_str).collect::<Vec<_>>())?;
        for row in cells.iter() {
            line(f, &row.iter().map(String::as_str).collect::<Vec<_>>())?;
        }
        Ok(())
    }
}

impl Log for ErrorSummary {
    fn log(&self) {
        use crate::log::*;

        let skipped = self.skipped().count();
        info!(
            "verified {} file(s): {} accepted, {} skipped",
            self.rows.len(),
            self.rows.len() - skipped,
            skipped
        );
        for row in self.skipped() {
            warn!("skipped {}: {}", row.file, row.status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> ErrorSummary {
        let mut summary = ErrorSummary::new();
        summary.push("a.gds", FileStatus::Passed, ErrorCounts::default());
        summary.push(
            "broken_design.gds",
            FileStatus::Skipped("disconnected pins".to_string()),
            ErrorCounts {
                disconnected_pins: 3,
                ..Default::default()
            },
        );
        summary
    }

    #[test]
    fn table_lists_every_file() {
        let table = summary().to_string();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("file"));
        assert!(lines[3].starts_with("broken_design.gds  skipped (disconnected pins)"));
        assert!(lines[3].contains(" 3 "));
    }

    #[test]
    fn csv_has_header_and_rows() {
        let dir = tempdir::TempDir::new("summary").unwrap();
        let path = dir.path().join("error_summary.csv");
        summary().write_csv(&path).unwrap();
        let csv = std::fs::read_to_string(&path).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("file,status,disconnected_pins,floating_shapes,invalid_components,missing_pins,pin_errors,other_errors,verification_failed,total")
        );
        assert_eq!(lines.next(), Some("a.gds,passed,0,0,0,0,0,0,0,0"));
        assert_eq!(
            lines.next(),
            Some("broken_design.gds,skipped (disconnected pins),3,0,0,0,0,0,0,3")
        );
    }
}
