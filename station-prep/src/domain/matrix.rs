//! Pairwise distance matrix.

use serde::{Deserialize, Serialize};

/// Square matrix of distances in kilometres.
///
/// `get(i, j)` is the distance between the `i`th and `j`th station in the
/// order the matrix was built from. Both halves are stored even though the
/// values are symmetric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    rows: Vec<Vec<f64>>,
}

impl DistanceMatrix {
    /// Wrap pre-computed rows. Each row must have one entry per row.
    pub(crate) fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == rows.len()));
        Self { rows }
    }

    /// Number of stations (rows and columns).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true for a matrix over no stations.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distance between stations `i` and `j`, if both are in range.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.rows.get(i)?.get(j).copied()
    }

    /// All distances from station `i`.
    pub fn row(&self, i: usize) -> Option<&[f64]> {
        self.rows.get(i).map(Vec::as_slice)
    }

    /// Iterate over rows in station order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.rows.iter().map(Vec::as_slice)
    }
}
