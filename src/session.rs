//! Director session: the consumer-facing state holder.
//!
//! Sensor streams update the session independently; directors are evaluated on demand
//! from whatever the session last saw. Only the heading filter carries history.

use chrono::{DateTime, Utc};

use crate::config::DirectorConfig;
use crate::detect::DetectionResult;
use crate::director::{
    direct_composition, evaluate_lighting, guide_to_landmark, CompositionInputs,
    DirectorInstruction, LandmarkAdvice, LightingAdvice,
};
use crate::geo::GeoCoordinate;
use crate::heading::HeadingSmoother;
use crate::solar::{sun_position, SunPosition};

/// Device attitude from the motion sensors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceAttitude {
    /// Radians, positive clockwise.
    pub roll: f64,
    pub is_level: bool,
}

impl Default for DeviceAttitude {
    fn default() -> Self {
        Self {
            roll: 0.0,
            is_level: true,
        }
    }
}

pub struct DirectorSession {
    config: DirectorConfig,
    heading: HeadingSmoother,
    location: Option<GeoCoordinate>,
    detection: DetectionResult,
    attitude: DeviceAttitude,
}

impl DirectorSession {
    pub fn new(config: DirectorConfig) -> Self {
        let heading = HeadingSmoother::new(config.heading_alpha);
        Self {
            config,
            heading,
            location: None,
            detection: DetectionResult::empty(),
            attitude: DeviceAttitude::default(),
        }
    }

    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    /// Feed a raw compass bearing; returns the smoothed heading.
    pub fn on_heading(&mut self, raw_degrees: f64) -> Option<f64> {
        self.heading.update(raw_degrees)
    }

    /// Record the user's position. Out-of-range or non-finite fixes are dropped.
    pub fn on_location(&mut self, coordinate: GeoCoordinate) -> bool {
        if !coordinate.is_valid() {
            log::warn!(
                "location rejected: lat={} lon={}",
                coordinate.latitude,
                coordinate.longitude
            );
            return false;
        }
        self.location = Some(coordinate);
        true
    }

    pub fn on_detection(&mut self, result: DetectionResult) {
        self.detection = result;
    }

    pub fn on_attitude(&mut self, attitude: DeviceAttitude) {
        self.attitude = attitude;
    }

    pub fn heading(&self) -> Option<f64> {
        self.heading.current()
    }

    pub fn location(&self) -> Option<GeoCoordinate> {
        self.location
    }

    pub fn detection(&self) -> &DetectionResult {
        &self.detection
    }

    /// Forget sensor history, e.g. when the camera screen reopens.
    pub fn reset(&mut self) {
        self.heading.reset();
        self.location = None;
        self.detection = DetectionResult::empty();
        self.attitude = DeviceAttitude::default();
    }

    pub fn composition(&self) -> DirectorInstruction {
        let inputs = CompositionInputs::from_detection(
            &self.detection,
            self.config.target_point,
            self.attitude.roll,
            self.attitude.is_level,
        );
        direct_composition(&inputs, &self.config.composition)
    }

    /// Sun position at the last known location.
    pub fn sun(&self, now: DateTime<Utc>) -> Option<SunPosition> {
        self.location.map(|location| sun_position(now, location))
    }

    /// Lighting advice using the configured variant. Calibrating until both a
    /// location and a heading are known.
    pub fn lighting(&self, now: DateTime<Utc>) -> LightingAdvice {
        match self.sun(now) {
            Some(sun) => evaluate_lighting(
                &sun,
                self.heading(),
                self.config.lighting_variant,
                &self.config.lighting,
            ),
            None => LightingAdvice::calibrating(),
        }
    }

    /// Guidance toward the configured landmark, if one is configured and a location
    /// is known.
    pub fn landmark(&self, now: DateTime<Utc>) -> Option<LandmarkAdvice> {
        let landmark = self.config.landmark.as_ref()?;
        let location = self.location?;
        let sun = sun_position(now, location);
        Some(guide_to_landmark(
            location,
            self.heading(),
            &sun,
            landmark,
            self.config.alignment_tolerance,
            &self.config.lighting,
        ))
    }
}
