//! Base station usage and distance preparation.
//!
//! Reads an address-sorted list of cellular base stations and an
//! address-sorted session log, attributes each session to its station, and
//! computes the full distance matrix between the stations that saw use.
//! The outputs feed a downstream placement algorithm.

pub mod cache;
pub mod domain;
pub mod geo;
pub mod ingest;
pub mod matrix;
pub mod pipeline;
