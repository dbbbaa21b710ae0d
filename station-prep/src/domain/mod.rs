//! Domain types for the station data pipeline.
//!
//! Plain value types shared by the ingest, matrix and cache layers. They are
//! serializable so each stage's output can be persisted in a cache slot.

mod error;
mod matrix;
mod session;
mod station;

pub use error::TimestampError;
pub use matrix::DistanceMatrix;
pub use session::{SessionRecord, TIMESTAMP_FORMAT, parse_timestamp};
pub use station::Station;
