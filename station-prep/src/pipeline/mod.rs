//! End-to-end run: load stations, merge sessions, build distances.
//!
//! The stages run one after another on the calling thread, sharing one
//! [`ResultCache`]. Each stage consumes the previous stage's full output.

mod config;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::{CacheError, ResultCache};
use crate::domain::{DistanceMatrix, Station};
use crate::ingest::{self, IngestError, MergeReport, STATIONS_SLOT, USAGE_SLOT};
use crate::matrix::{self, DISTANCES_SLOT};

pub use config::PipelineConfig;

/// All cache slots written by the pipeline, in stage order.
pub const SLOTS: [&str; 3] = [STATIONS_SLOT, USAGE_SLOT, DISTANCES_SLOT];

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Loading or merging an input failed
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Clearing a cache slot failed
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Result of a pipeline run, ready for a placement algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Stations that received sessions, with ids `0..n`.
    pub stations: Vec<Station>,
    /// `distances.get(i, j)` is between `stations[i]` and `stations[j]`.
    pub distances: DistanceMatrix,
    /// Diagnostics from the session merge.
    pub report: MergeReport,
}

/// Run all three stages.
pub fn run(config: &PipelineConfig) -> Result<PipelineOutput, PipelineError> {
    let cache = ResultCache::new(config.cache.clone());
    info!(
        stations = %config.stations_path.display(),
        sessions = %config.sessions_path.display(),
        cache_dir = %cache.dir().display(),
        key_policy = %cache.key_policy(),
        "starting pipeline"
    );

    let stations = ingest::load_stations(&config.stations_path, &cache)?;
    let merged = ingest::load_usage(&config.sessions_path, &stations, &cache)?;
    let distances = matrix::load_matrix(&merged.stations, &cache);

    Ok(PipelineOutput {
        stations: merged.stations,
        distances,
        report: merged.report,
    })
}

/// Remove every pipeline slot from the cache. Returns how many existed.
pub fn invalidate_all(cache: &ResultCache) -> Result<usize, PipelineError> {
    let mut removed = 0;
    for slot in SLOTS {
        if cache.invalidate(slot)? {
            removed += 1;
        }
    }
    info!(removed, dir = %cache.dir().display(), "cleared pipeline cache");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, CacheKey, KeyPolicy};
    use std::fs;
    use std::path::Path;
    use tempfile::{TempDir, tempdir};

    const STATIONS: &str = "A,31.20,121.40\nB,31.25,121.45\nC,30.90,121.10\n";
    const SESSIONS: &str = "user,imsi,start,end,address\n\
        u1,x,2020/01/01 00:10,2020/01/01 00:00,A\n\
        u2,x,2020/01/01 00:20,2020/01/01 00:00,A\n\
        u3,x,2020/01/01 00:05,2020/01/01 00:00,B\n";

    fn setup(stations: &str, sessions: &str) -> (TempDir, PipelineConfig) {
        let dir = tempdir().unwrap();
        let stations_path = dir.path().join("bs.csv");
        let sessions_path = dir.path().join("sessions.csv");
        fs::write(&stations_path, stations).unwrap();
        fs::write(&sessions_path, sessions).unwrap();
        let config = PipelineConfig::new(stations_path, sessions_path)
            .with_cache(CacheConfig::new(dir.path().join("cache")));
        (dir, config)
    }

    fn all_slots_exist(dir: &Path) -> bool {
        SLOTS.iter().all(|slot| dir.join(format!("{slot}.json")).exists())
    }

    #[test]
    fn end_to_end() {
        let (_dir, config) = setup(STATIONS, SESSIONS);
        let output = run(&config).unwrap();

        let addresses: Vec<_> = output.stations.iter().map(|s| s.address.as_str()).collect();
        assert_eq!(addresses, ["A", "B"]);
        assert_eq!(output.stations[0].id, 0);
        assert_eq!(output.stations[0].user_count, 2);
        assert_eq!(output.stations[0].workload_minutes, 30.0);
        assert_eq!(output.stations[1].id, 1);
        assert_eq!(output.stations[1].user_count, 1);

        assert_eq!(output.distances.len(), 2);
        assert!(output.distances.get(0, 0).unwrap().abs() < 1e-9);
        assert!(output.distances.get(0, 1).unwrap() > 0.0);
        assert_eq!(output.report.sessions_attributed, 3);
        assert!(all_slots_exist(&config.cache.dir));
    }

    #[test]
    fn second_run_is_served_from_cache() {
        let (_dir, config) = setup(STATIONS, SESSIONS);
        let first = run(&config).unwrap();

        // Poison the distance slot with a sentinel under the live key to
        // prove the second run reads it instead of recomputing.
        let cache = ResultCache::new(config.cache.clone());
        let entry = cache.load::<DistanceMatrix>(DISTANCES_SLOT).unwrap();
        let sentinel = DistanceMatrix::default();
        cache.store(DISTANCES_SLOT, &entry.key, &sentinel).unwrap();

        let second = run(&config).unwrap();
        assert_eq!(second.stations, first.stations);
        assert_eq!(second.distances, sentinel);
    }

    #[test]
    fn corrupt_slots_are_recomputed() {
        let (_dir, config) = setup(STATIONS, SESSIONS);
        let first = run(&config).unwrap();

        for slot in SLOTS {
            fs::write(config.cache.dir.join(format!("{slot}.json")), b"{garbage").unwrap();
        }

        let second = run(&config).unwrap();
        assert_eq!(second, first);
    }

    #[test]
    fn station_parse_error_propagates() {
        let (_dir, config) = setup("A,1,2\nB,oops,2\n", SESSIONS);
        let err = run(&config).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Ingest(IngestError::InvalidCoordinate { line: 2, .. })
        ));
        assert!(!config.cache.dir.join("base_stations.json").exists());
    }

    #[test]
    fn cardinality_keys_match_legacy_derivation() {
        let (_dir, mut config) = setup(STATIONS, SESSIONS);
        config.cache.key_policy = KeyPolicy::Cardinality;
        run(&config).unwrap();

        let cache = ResultCache::new(config.cache.clone());
        let stations = cache.load::<Vec<Station>>(STATIONS_SLOT).unwrap();
        assert_eq!(
            stations.key,
            CacheKey::of_value(config.stations_path.display())
        );
        let usage = cache.load::<ingest::MergeOutcome>(USAGE_SLOT).unwrap();
        assert_eq!(usage.key, CacheKey::Length(3));
        let distances = cache.load::<DistanceMatrix>(DISTANCES_SLOT).unwrap();
        assert_eq!(distances.key, CacheKey::Length(2));
    }

    #[test]
    fn invalidate_all_clears_slots() {
        let (_dir, config) = setup(STATIONS, SESSIONS);
        run(&config).unwrap();

        let cache = ResultCache::new(config.cache.clone());
        assert_eq!(invalidate_all(&cache).unwrap(), 3);
        assert_eq!(invalidate_all(&cache).unwrap(), 0);
        assert!(cache.load::<Vec<Station>>(STATIONS_SLOT).is_none());
    }

    #[test]
    fn invalidate_all_reports_undeletable_slot() {
        let dir = tempdir().unwrap();
        let cache = ResultCache::new(CacheConfig::new(dir.path()));
        // A directory where a slot file should be can't be removed as a file.
        fs::create_dir(cache.slot_path(STATIONS_SLOT)).unwrap();

        let err = invalidate_all(&cache).unwrap_err();
        assert!(matches!(err, PipelineError::Cache(CacheError::File { .. })));
    }
}
