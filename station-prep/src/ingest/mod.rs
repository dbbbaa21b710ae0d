//! CSV ingest: base stations and session logs.
//!
//! Both inputs are sorted by address. Stations are loaded first and
//! numbered by row; session logs are then merged into them with a forward
//! two-pointer scan (see [`merge_usage`]). Each stage is memoised in its
//! own [`ResultCache`](crate::cache::ResultCache) slot.

mod error;
mod merge;
mod sessions;
mod stations;

use std::fs;
use std::path::Path;

use csv::StringRecord;

pub use error::IngestError;
pub use merge::{MergeOutcome, MergeReport, merge_usage};
pub use sessions::{USAGE_SLOT, load_usage, parse_sessions};
pub use stations::{STATIONS_SLOT, load_stations, parse_stations};

/// Read a whole input file. The handle is closed before returning.
fn read_file(path: &Path) -> Result<Vec<u8>, IngestError> {
    fs::read(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// 1-based line of a record, falling back to `fallback` when the reader
/// didn't track positions.
fn line_of(record: &StringRecord, fallback: usize) -> usize {
    record
        .position()
        .map_or(fallback, |pos| pos.line() as usize)
}

/// Fetch a required column from a record.
fn field<'r>(
    record: &'r StringRecord,
    index: usize,
    name: &'static str,
    line: usize,
) -> Result<&'r str, IngestError> {
    record
        .get(index)
        .ok_or(IngestError::MissingField { line, field: name })
}
