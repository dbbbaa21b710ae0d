//! Ingest error types.

use std::num::ParseFloatError;
use std::path::PathBuf;

/// Errors that abort loading an input file.
///
/// Malformed session timestamps are not here: they are recovered during the
/// merge and counted in [`MergeReport`](super::MergeReport).
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Input file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// CSV framing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A row has fewer columns than required
    #[error("line {line}: missing {field} column")]
    MissingField { line: usize, field: &'static str },

    /// Latitude or longitude is not a number
    #[error("line {line}: invalid {field} {value:?}: {source}")]
    InvalidCoordinate {
        line: usize,
        field: &'static str,
        value: String,
        source: ParseFloatError,
    },
}
