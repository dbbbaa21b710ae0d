//! Base station records.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A base station with its location and the usage attributed to it.
///
/// `id` is positional, not an identity: the loader sets it to the row
/// ordinal and the usage merge renumbers it in order of first match.
/// `address` is the join key against session logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: usize,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Number of sessions attributed to this station.
    #[serde(default)]
    pub user_count: u64,
    /// Sum of attributed session durations, in minutes.
    #[serde(default)]
    pub workload_minutes: f64,
}

impl Station {
    /// Create a station with no usage attributed yet.
    pub fn new(id: usize, address: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            address: address.into(),
            latitude,
            longitude,
            user_count: 0,
            workload_minutes: 0.0,
        }
    }

    /// Attribute one session of the given duration to this station.
    pub fn record_session(&mut self, minutes: f64) {
        self.user_count += 1;
        self.workload_minutes += minutes;
    }
}

// Only used for cache keys. Floats are hashed by bit pattern, so 0.0 and
// -0.0 differ even though they compare equal.
impl Hash for Station {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.id);
        self.address.hash(state);
        state.write_u64(self.latitude.to_bits());
        state.write_u64(self.longitude.to_bits());
        state.write_u64(self.user_count);
        state.write_u64(self.workload_minutes.to_bits());
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Station({}: {} @ {}, {})",
            self.id, self.address, self.latitude, self.longitude
        )
    }
}
