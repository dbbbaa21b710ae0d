//! Session log loading.

use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::info;

use super::{IngestError, MergeOutcome, field, line_of, merge_usage, read_file};
use crate::cache::{CacheKey, KeyPolicy, ResultCache};
use crate::domain::{SessionRecord, Station};

/// Cache slot for stations enriched with usage.
pub const USAGE_SLOT: &str = "base_stations_with_user_info";

const SESSION_START: usize = 2;
const SESSION_END: usize = 3;
const ADDRESS: usize = 4;

/// Parse session rows. The first row is a header and is skipped.
///
/// Only the start, end and address columns (2, 3, 4) are read. Timestamps
/// are kept as text; see [`SessionRecord::duration_minutes`].
pub fn parse_sessions<R: Read>(reader: R) -> Result<Vec<SessionRecord>, IngestError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut sessions = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        let record = result?;
        let line = line_of(&record, index + 2);

        let start = field(&record, SESSION_START, "session start", line)?;
        let end = field(&record, SESSION_END, "session end", line)?;
        let address = field(&record, ADDRESS, "address", line)?;

        sessions.push(SessionRecord::new(address, start, end));
    }

    Ok(sessions)
}

/// Merge the session log at `path` into `stations`, reusing the
/// `base_stations_with_user_info` slot when the input is unchanged.
///
/// Under [`KeyPolicy::Cardinality`] the key is the number of stations only:
/// a different session log over the same station count is served from the
/// cache.
pub fn load_usage(
    path: impl AsRef<Path>,
    stations: &[Station],
    cache: &ResultCache,
) -> Result<MergeOutcome, IngestError> {
    let path = path.as_ref();

    let (key, contents) = match cache.key_policy() {
        KeyPolicy::Cardinality => (CacheKey::of_len(stations), None),
        KeyPolicy::Content => {
            let bytes = read_file(path)?;
            (CacheKey::of_hash(&(bytes.as_slice(), stations)), Some(bytes))
        }
    };

    cache.run_cached(USAGE_SLOT, key, || {
        let bytes = match contents {
            Some(bytes) => bytes,
            None => read_file(path)?,
        };
        let sessions = parse_sessions(bytes.as_slice())?;
        let outcome = merge_usage(&sessions, stations.to_vec());
        let report = &outcome.report;
        info!(
            path = %path.display(),
            stations = outcome.stations.len(),
            sessions = report.sessions_read,
            attributed = report.sessions_attributed,
            unmatched = report.unmatched_sessions,
            bad_timestamps = report.timestamp_failures,
            "merged user sessions"
        );
        Ok(outcome)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use std::fs;
    use tempfile::tempdir;

    const HEADER: &str = "user,imsi,start,end,address\n";

    fn stations() -> Vec<Station> {
        vec![
            Station::new(0, "A", 0.0, 0.0),
            Station::new(1, "B", 0.0, 0.0),
            Station::new(2, "C", 0.0, 0.0),
        ]
    }

    #[test]
    fn header_is_skipped() {
        let input = format!("{HEADER}u1,x,2020/01/01 00:10,2020/01/01 00:00,A\n");
        let sessions = parse_sessions(input.as_bytes()).unwrap();
        assert_eq!(
            sessions,
            vec![SessionRecord::new("A", "2020/01/01 00:10", "2020/01/01 00:00")]
        );
    }

    #[test]
    fn header_only_is_empty() {
        assert!(parse_sessions(HEADER.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn short_row_is_missing_field() {
        let input = format!("{HEADER}u1,x,2020/01/01 00:10,2020/01/01 00:00,A\nu2,x,2020/01/01 00:10\n");
        let err = parse_sessions(input.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            IngestError::MissingField {
                line: 3,
                field: "session end"
            }
        ));
    }

    #[test]
    fn malformed_timestamps_still_parse() {
        let input = format!("{HEADER}u1,x,soon,later,A\n");
        let sessions = parse_sessions(input.as_bytes()).unwrap();
        assert_eq!(sessions[0].session_start, "soon");
    }

    #[test]
    fn load_usage_merges_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("sessions.csv");
        let cache = ResultCache::new(CacheConfig::new(dir.path().join("cache")));
        fs::write(
            &input,
            format!(
                "{HEADER}\
                 u1,x,2020/01/01 00:10,2020/01/01 00:00,A\n\
                 u2,x,2020/01/01 00:05,2020/01/01 00:00,C\n"
            ),
        )
        .unwrap();

        let outcome = load_usage(&input, &stations(), &cache).unwrap();
        let addresses: Vec<_> = outcome.stations.iter().map(|s| s.address.as_str()).collect();
        assert_eq!(addresses, ["A", "C"]);
        assert_eq!(outcome.stations[1].id, 1);
        assert_eq!(outcome.stations[1].workload_minutes, 5.0);
        assert!(cache.slot_path(USAGE_SLOT).exists());
    }

    #[test]
    fn cardinality_policy_keys_on_station_count() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("sessions.csv");
        let config = CacheConfig::new(dir.path().join("cache")).with_key_policy(KeyPolicy::Cardinality);
        let cache = ResultCache::new(config);

        fs::write(&input, format!("{HEADER}u1,x,2020/01/01 00:10,2020/01/01 00:00,A\n")).unwrap();
        let first = load_usage(&input, &stations(), &cache).unwrap();

        fs::write(&input, format!("{HEADER}u1,x,2020/01/01 00:10,2020/01/01 00:00,B\n")).unwrap();
        let stale = load_usage(&input, &stations(), &cache).unwrap();
        assert_eq!(stale, first);

        // A different station count is a miss.
        let fresh = load_usage(&input, &stations()[..2], &cache).unwrap();
        assert_eq!(fresh.stations[0].address, "B");
    }

    #[test]
    fn content_policy_notices_session_edits() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("sessions.csv");
        let cache = ResultCache::new(CacheConfig::new(dir.path().join("cache")));

        fs::write(&input, format!("{HEADER}u1,x,2020/01/01 00:10,2020/01/01 00:00,A\n")).unwrap();
        load_usage(&input, &stations(), &cache).unwrap();

        fs::write(&input, format!("{HEADER}u1,x,2020/01/01 00:10,2020/01/01 00:00,B\n")).unwrap();
        let fresh = load_usage(&input, &stations(), &cache).unwrap();
        assert_eq!(fresh.stations[0].address, "B");
    }
}
