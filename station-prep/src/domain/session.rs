//! Session log records.

use chrono::NaiveDateTime;

use super::TimestampError;

/// Format of session start/end timestamps, e.g. `2020/01/31 23:05`.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M";

/// Parse a session timestamp in [`TIMESTAMP_FORMAT`].
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, TimestampError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map_err(|e| TimestampError::new(s, e))
}

/// One user session read from the session log.
///
/// Timestamps are kept as raw text; they are only parsed when the duration
/// is needed, so a malformed timestamp costs the session its duration but
/// not its attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub address: String,
    pub session_start: String,
    pub session_end: String,
}

impl SessionRecord {
    pub fn new(
        address: impl Into<String>,
        session_start: impl Into<String>,
        session_end: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            session_start: session_start.into(),
            session_end: session_end.into(),
        }
    }

    /// Session duration in minutes, computed as `start - end`.
    ///
    /// The operand order matches the historical outputs this pipeline feeds,
    /// so a log where the end follows the start yields a negative value.
    ///
    /// ```
    /// use station_prep::domain::SessionRecord;
    ///
    /// let s = SessionRecord::new("A", "2020/01/01 00:10", "2020/01/01 00:00");
    /// assert_eq!(s.duration_minutes().unwrap(), 10.0);
    ///
    /// let s = SessionRecord::new("A", "2020/01/01 00:00", "2020/01/01 00:10");
    /// assert_eq!(s.duration_minutes().unwrap(), -10.0);
    /// ```
    pub fn duration_minutes(&self) -> Result<f64, TimestampError> {
        let start = parse_timestamp(&self.session_start)?;
        let end = parse_timestamp(&self.session_end)?;
        Ok((start - end).num_seconds() as f64 / 60.0)
    }
}
