//! Base station loading.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use super::{IngestError, field, line_of, read_file};
use crate::cache::{CacheKey, KeyPolicy, ResultCache};
use crate::domain::Station;

/// Cache slot for loaded stations.
pub const STATIONS_SLOT: &str = "base_stations";

const ADDRESS: usize = 0;
const LATITUDE: usize = 1;
const LONGITUDE: usize = 2;

/// Parse header-less `address,latitude,longitude` rows.
///
/// Each station's id is its zero-based row number. Extra columns are
/// ignored. A non-numeric coordinate aborts the parse.
pub fn parse_stations<R: Read>(reader: R) -> Result<Vec<Station>, IngestError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut stations = Vec::new();
    for (id, result) in rdr.records().enumerate() {
        let record = result?;
        let line = line_of(&record, id + 1);

        let address = field(&record, ADDRESS, "address", line)?;
        let latitude = coordinate(&record, LATITUDE, "latitude", line)?;
        let longitude = coordinate(&record, LONGITUDE, "longitude", line)?;

        debug!(id, address, latitude, longitude, "base station");
        stations.push(Station::new(id, address, latitude, longitude));
    }

    Ok(stations)
}

/// Load stations from `path`, reusing the `base_stations` slot when the
/// input is unchanged according to the cache's key policy.
///
/// Under [`KeyPolicy::Cardinality`] the key is the path itself, so edits to
/// the file are not noticed until the slot is invalidated.
pub fn load_stations(
    path: impl AsRef<Path>,
    cache: &ResultCache,
) -> Result<Vec<Station>, IngestError> {
    let path = path.as_ref();

    let (key, contents) = match cache.key_policy() {
        KeyPolicy::Cardinality => (CacheKey::of_value(path.display()), None),
        KeyPolicy::Content => {
            let bytes = read_file(path)?;
            (CacheKey::of_content(&bytes), Some(bytes))
        }
    };

    cache.run_cached(STATIONS_SLOT, key, || {
        let bytes = match contents {
            Some(bytes) => bytes,
            None => read_file(path)?,
        };
        let stations = parse_stations(bytes.as_slice())?;
        info!(count = stations.len(), path = %path.display(), "loaded base stations");
        Ok(stations)
    })
}

fn coordinate(
    record: &StringRecord,
    index: usize,
    name: &'static str,
    line: usize,
) -> Result<f64, IngestError> {
    let raw = field(record, index, name, line)?;
    raw.trim()
        .parse()
        .map_err(|source| IngestError::InvalidCoordinate {
            line,
            field: name,
            value: raw.to_string(),
            source,
        })
}
