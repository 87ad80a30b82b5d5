//! Compass and geodesic helpers shared by the heading smoother and the directors.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Normalize an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Signed angle from `from` to `to`, normalized into `(-180, 180]`.
///
/// Positive means `to` lies clockwise of `from`.
pub fn relative_bearing(to: f64, from: f64) -> f64 {
    let delta = normalize_degrees(to - from);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// A WGS84 latitude/longitude pair in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and within the usual latitude/longitude ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Initial great-circle bearing toward `other`, degrees clockwise from north.
    pub fn bearing_to(&self, other: &GeoCoordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();
        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        normalize_degrees(y.atan2(x).to_degrees())
    }

    /// Haversine distance to `other` in meters.
    pub fn distance_to(&self, other: &GeoCoordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_into_compass_range() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
    }

    #[test]
    fn relative_bearing_range_and_sign() {
        assert_eq!(relative_bearing(10.0, 350.0), 20.0);
        assert_eq!(relative_bearing(350.0, 10.0), -20.0);
        assert_eq!(relative_bearing(180.0, 0.0), 180.0);
        assert_eq!(relative_bearing(0.0, 180.0), 180.0);
        assert_eq!(relative_bearing(90.0, 90.0), 0.0);
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = GeoCoordinate::new(0.0, 0.0);
        assert!((origin.bearing_to(&GeoCoordinate::new(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((origin.bearing_to(&GeoCoordinate::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((origin.bearing_to(&GeoCoordinate::new(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((origin.bearing_to(&GeoCoordinate::new(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let a = GeoCoordinate::new(0.0, 0.0);
        let b = GeoCoordinate::new(1.0, 0.0);
        let d = a.distance_to(&b);
        assert!((d - 111_195.0).abs() < 100.0, "distance {d}");
    }

    #[test]
    fn validity() {
        assert!(GeoCoordinate::new(48.8584, 2.2945).is_valid());
        assert!(!GeoCoordinate::new(91.0, 0.0).is_valid());
        assert!(!GeoCoordinate::new(0.0, f64::NAN).is_valid());
    }
}
