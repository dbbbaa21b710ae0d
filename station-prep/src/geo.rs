//! Great-circle distance between stations.

use crate::domain::Station;

/// π / 180.
const DEG_TO_RAD: f64 = 0.017_453_292_519_943_295;

/// Earth diameter in kilometres (2 × 6371).
const EARTH_DIAMETER_KM: f64 = 12_742.0;

/// Great-circle distance using the haversine formula.
///
/// Inputs are decimal degrees and are not range-checked. Output is in
/// kilometres.
///
/// # Examples
///
/// ```
/// use station_prep::geo::distance_km;
///
/// assert!(distance_km(31.2, 121.4, 31.2, 121.4).abs() < 1e-9);
///
/// // One degree of latitude is roughly 111 km.
/// let d = distance_km(0.0, 0.0, 1.0, 0.0);
/// assert!((d - 111.19).abs() < 0.01);
/// ```
pub fn distance_km(lat_a: f64, lng_a: f64, lat_b: f64, lng_b: f64) -> f64 {
    let a = 0.5 - ((lat_b - lat_a) * DEG_TO_RAD).cos() / 2.0
        + (lat_a * DEG_TO_RAD).cos()
            * (lat_b * DEG_TO_RAD).cos()
            * (1.0 - ((lng_b - lng_a) * DEG_TO_RAD).cos())
            / 2.0;
    EARTH_DIAMETER_KM * a.sqrt().asin()
}

/// Distance in kilometres between two stations' coordinates.
pub fn station_distance_km(a: &Station, b: &Station) -> f64 {
    distance_km(a.latitude, a.longitude, b.latitude, b.longitude)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Distance from a point to itself is zero up to rounding
        #[test]
        fn identity(lat in -90.0f64..90.0, lng in -180.0f64..180.0) {
            prop_assert!(distance_km(lat, lng, lat, lng).abs() < 1e-9);
        }

        /// Swapping the endpoints gives the same distance
        #[test]
        fn symmetric(
            lat_a in -90.0f64..90.0,
            lng_a in -180.0f64..180.0,
            lat_b in -90.0f64..90.0,
            lng_b in -180.0f64..180.0,
        ) {
            let ab = distance_km(lat_a, lng_a, lat_b, lng_b);
            let ba = distance_km(lat_b, lng_b, lat_a, lng_a);
            prop_assert_eq!(ab, ba);
        }

        /// Never negative and never more than half the circumference
        #[test]
        fn bounded(
            lat_a in -90.0f64..90.0,
            lng_a in -180.0f64..180.0,
            lat_b in -90.0f64..90.0,
            lng_b in -180.0f64..180.0,
        ) {
            let d = distance_km(lat_a, lng_a, lat_b, lng_b);
            prop_assert!(d >= 0.0);
            prop_assert!(d <= std::f64::consts::PI * EARTH_DIAMETER_KM / 2.0 + 1e-6);
        }
    }
}
