//! Domain error types.
//!
//! These are recoverable: callers log them and carry on with a default.

/// Error returned when a session timestamp does not match
/// [`TIMESTAMP_FORMAT`](super::TIMESTAMP_FORMAT).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid session timestamp {value:?}: {reason}")]
pub struct TimestampError {
    value: String,
    reason: String,
}

impl TimestampError {
    pub(crate) fn new(value: &str, reason: impl ToString) -> Self {
        Self {
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The text that failed to parse.
    pub fn value(&self) -> &str {
        &self.value
    }
}
