//! Error taxonomy for a report run.
//!
//! File-level and schema-level problems are fatal [`ReportError`]s. Per-row
//! problems never abort a run; they are collected as [`SkippedRow`]s.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("cannot read input {}: {reason}", path.display())]
    InputUnreadable { path: PathBuf, reason: String },

    #[error(
        "no usable date/product/amount columns ({missing}); {rows} data rows, {skipped} skipped"
    )]
    NoResolvableColumns {
        missing: String,
        rows: usize,
        skipped: usize,
    },

    #[error("amount overflow while summing sales")]
    AmountOverflow,

    #[error("cannot write output {}: {source}", path.display())]
    OutputWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Why a raw row was dropped during normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    MissingDate,
    UnparseableDate,
    MissingProduct,
    MissingAmount,
    InvalidAmount,
    NegativeAmount,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingDate => "missing date",
            SkipReason::UnparseableDate => "unparseable date",
            SkipReason::MissingProduct => "missing product",
            SkipReason::MissingAmount => "missing amount",
            SkipReason::InvalidAmount => "non-numeric amount",
            SkipReason::NegativeAmount => "negative amount",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable per-row failure. `row` is the 1-based data row index
/// (the header is not counted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: SkipReason,
}
