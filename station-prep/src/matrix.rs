//! Pairwise station distances.

use std::convert::Infallible;

use tracing::{debug, info};

use crate::cache::{CacheKey, KeyPolicy, ResultCache};
use crate::domain::{DistanceMatrix, Station};
use crate::geo::station_distance_km;

/// Cache slot for the distance matrix.
pub const DISTANCES_SLOT: &str = "distances";

/// Distance between every ordered pair of stations, diagonal included.
///
/// Row and column `i` refer to `stations[i]`. The full square is computed
/// rather than one triangle so callers can index either way round.
pub fn build_matrix(stations: &[Station]) -> DistanceMatrix {
    let rows = stations
        .iter()
        .map(|from| {
            let row: Vec<f64> = stations
                .iter()
                .map(|to| station_distance_km(from, to))
                .collect();
            debug!(station = %from, "calculated distances to other base stations");
            row
        })
        .collect();

    DistanceMatrix::from_rows(rows)
}

/// [`build_matrix`], reusing the `distances` slot when the stations are
/// unchanged according to the cache's key policy.
///
/// Under [`KeyPolicy::Cardinality`] only the station count is compared, so
/// moved stations are not noticed.
pub fn load_matrix(stations: &[Station], cache: &ResultCache) -> DistanceMatrix {
    let key = match cache.key_policy() {
        KeyPolicy::Cardinality => CacheKey::of_len(stations),
        KeyPolicy::Content => CacheKey::of_hash(stations),
    };

    let Ok(matrix) = cache.run_cached::<_, Infallible, _>(DISTANCES_SLOT, key, || {
        let matrix = build_matrix(stations);
        info!(stations = matrix.len(), "built distance matrix");
        Ok(matrix)
    });
    matrix
}
