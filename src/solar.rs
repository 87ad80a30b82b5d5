//! Sun position for a time and place.
//!
//! Closed-form NOAA solar equations; accurate to a fraction of a degree, which is
//! plenty for lighting advice. Nothing is cached: each call recomputes from scratch.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{normalize_degrees, GeoCoordinate};

/// Golden hour: the sun between these elevations (degrees).
pub const GOLDEN_HOUR_MIN_ELEVATION: f64 = -4.0;
pub const GOLDEN_HOUR_MAX_ELEVATION: f64 = 6.0;

const JULIAN_UNIX_EPOCH: f64 = 2_440_587.5;
const JULIAN_J2000: f64 = 2_451_545.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SunPosition {
    /// Degrees clockwise from true north, `[0, 360)`.
    pub azimuth: f64,
    /// Degrees above the horizon, `[-90, 90]`.
    pub elevation: f64,
    pub is_golden_hour: bool,
}

impl SunPosition {
    pub fn new(azimuth: f64, elevation: f64, is_golden_hour: bool) -> Self {
        Self {
            azimuth,
            elevation,
            is_golden_hour,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.azimuth.is_finite() && self.elevation.is_finite()
    }
}

/// Compute the sun's position seen from `location` at `at`.
pub fn sun_position(at: DateTime<Utc>, location: GeoCoordinate) -> SunPosition {
    let seconds = at.timestamp() as f64 + f64::from(at.timestamp_subsec_millis()) / 1000.0;
    let julian_day = seconds / 86_400.0 + JULIAN_UNIX_EPOCH;
    let t = (julian_day - JULIAN_J2000) / 36_525.0;

    let mean_longitude = normalize_degrees(280.46646 + t * (36_000.76983 + t * 0.000_303_2));
    let mean_anomaly = 357.52911 + t * (35_999.05029 - 0.000_153_7 * t);
    let eccentricity = 0.016_708_634 - t * (0.000_042_037 + 0.000_000_126_7 * t);

    let m = mean_anomaly.to_radians();
    let center = m.sin() * (1.914_602 - t * (0.004_817 + 0.000_014 * t))
        + (2.0 * m).sin() * (0.019_993 - 0.000_101 * t)
        + (3.0 * m).sin() * 0.000_289;
    let true_longitude = mean_longitude + center;
    let omega = (125.04 - 1_934.136 * t).to_radians();
    let apparent_longitude = (true_longitude - 0.005_69 - 0.004_78 * omega.sin()).to_radians();

    let mean_obliquity =
        23.0 + (26.0 + (21.448 - t * (46.815 + t * (0.000_59 - t * 0.001_813))) / 60.0) / 60.0;
    let obliquity = (mean_obliquity + 0.002_56 * omega.cos()).to_radians();

    let declination = (obliquity.sin() * apparent_longitude.sin()).asin();

    let y = (obliquity / 2.0).tan().powi(2);
    let l0 = mean_longitude.to_radians();
    let equation_of_time = 4.0
        * (y * (2.0 * l0).sin() - 2.0 * eccentricity * m.sin()
            + 4.0 * eccentricity * y * m.sin() * (2.0 * l0).cos()
            - 0.5 * y * y * (4.0 * l0).sin()
            - 1.25 * eccentricity * eccentricity * (2.0 * m).sin())
        .to_degrees();

    let minutes_utc = f64::from(at.hour()) * 60.0
        + f64::from(at.minute())
        + f64::from(at.second()) / 60.0;
    let true_solar_time = (minutes_utc + equation_of_time + 4.0 * location.longitude)
        .rem_euclid(1_440.0);
    let mut hour_angle = true_solar_time / 4.0 - 180.0;
    if hour_angle < -180.0 {
        hour_angle += 360.0;
    }
    let hour_angle = hour_angle.to_radians();

    let latitude = location.latitude.to_radians();
    let cos_zenith = (latitude.sin() * declination.sin()
        + latitude.cos() * declination.cos() * hour_angle.cos())
    .clamp(-1.0, 1.0);
    let elevation = 90.0 - cos_zenith.acos().to_degrees();

    let azimuth = normalize_degrees(
        hour_angle
            .sin()
            .atan2(hour_angle.cos() * latitude.sin() - declination.tan() * latitude.cos())
            .to_degrees()
            + 180.0,
    );

    SunPosition {
        azimuth,
        elevation,
        is_golden_hour: (GOLDEN_HOUR_MIN_ELEVATION..=GOLDEN_HOUR_MAX_ELEVATION)
            .contains(&elevation),
    }
}
