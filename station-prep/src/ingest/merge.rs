//! Attribute sessions to stations with a sorted-address scan.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{SessionRecord, Station};

/// What happened while merging, for callers that want more than logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Session rows seen.
    pub sessions_read: usize,
    /// Sessions added to a station's usage.
    pub sessions_attributed: usize,
    /// Sessions whose timestamps didn't parse. They are still attributed,
    /// with zero duration.
    pub timestamp_failures: usize,
    /// Sessions dropped because no station was found for their address.
    pub unmatched_sessions: usize,
    /// Addresses that failed the forward scan, once per run of rows.
    pub unmatched_addresses: Vec<String>,
}

/// Stations that received at least one session, plus the merge report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub stations: Vec<Station>,
    pub report: MergeReport,
}

/// Merge address-sorted `sessions` into address-sorted `stations`.
///
/// Walks both lists once. When a session's address differs from the
/// currently matched station, the station list is scanned forward from the
/// last match. The first station found is renumbered with the next output
/// id and appended to the output; the session's duration and a user are
/// then added to it.
///
/// The scan never moves backwards. A session whose address sorts before the
/// last matched station is not found and is dropped, as is any session with
/// an address that has no station. Stations that never match are left out,
/// so output ids run `0..k` for `k` matched stations.
///
/// Sorting is a precondition, not something this checks.
pub fn merge_usage(sessions: &[SessionRecord], mut stations: Vec<Station>) -> MergeOutcome {
    let mut report = MergeReport::default();

    let mut emitted = vec![false; stations.len()];
    let mut output_order: Vec<usize> = Vec::new();

    let mut last_index = 0;
    let mut current: Option<usize> = None;
    let mut last_unmatched: Option<&str> = None;

    for session in sessions {
        report.sessions_read += 1;
        let address = session.address.as_str();

        let minutes = match session.duration_minutes() {
            Ok(minutes) => minutes,
            Err(e) => {
                warn!(address, error = %e, "failed to convert session time, using 0 minutes");
                report.timestamp_failures += 1;
                0.0
            }
        };

        let still_matched = current.is_some_and(|idx| stations[idx].address == address);
        if !still_matched && last_unmatched != Some(address) {
            current = stations[last_index..]
                .iter()
                .position(|s| s.address == address)
                .map(|offset| last_index + offset);

            match current {
                Some(idx) => {
                    last_index = idx;
                    last_unmatched = None;
                    if !emitted[idx] {
                        let id = output_order.len();
                        emitted[idx] = true;
                        stations[idx].id = id;
                        output_order.push(idx);
                        debug!(id, address, "matched base station");
                    }
                }
                None => {
                    warn!(
                        address,
                        "no base station at or after scan position, dropping sessions"
                    );
                    last_unmatched = Some(address);
                    report.unmatched_addresses.push(address.to_string());
                }
            }
        }

        match current {
            Some(idx) => {
                stations[idx].record_session(minutes);
                report.sessions_attributed += 1;
            }
            None => report.unmatched_sessions += 1,
        }
    }

    let mut slots: Vec<Option<Station>> = stations.into_iter().map(Some).collect();
    let stations = output_order
        .into_iter()
        .filter_map(|idx| slots[idx].take())
        .collect();

    MergeOutcome { stations, report }
}
