use serde::{Deserialize, Serialize};

use crate::director::lighting::{evaluate_lighting, LightingAdvice, LightingThresholds, LightingVariant};
use crate::director::{DirectorInstruction, Priority, Severity};
use crate::geo::{relative_bearing, GeoCoordinate};
use crate::solar::SunPosition;

/// Degrees either side of the landmark bearing that count as facing it.
pub const DEFAULT_ALIGNMENT_TOLERANCE: f64 = 15.0;

/// A named place the photographer wants in frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetLandmark {
    pub name: String,
    pub coordinate: GeoCoordinate,
}

impl TargetLandmark {
    pub fn new(name: impl Into<String>, coordinate: GeoCoordinate) -> Self {
        Self {
            name: name.into(),
            coordinate,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LandmarkAdvice {
    pub instruction: DirectorInstruction,
    /// Great-circle bearing from the user to the landmark.
    pub bearing: f64,
    pub distance_m: f64,
    /// Signed rotation toward the landmark; positive is right. `None` while the
    /// heading is unknown.
    pub turn: Option<f64>,
    /// Strict lighting for the facing direction, once aligned.
    pub lighting: Option<LightingAdvice>,
}

/// Steer the photographer toward `landmark`, then judge the light facing it.
pub fn guide_to_landmark(
    user: GeoCoordinate,
    heading: Option<f64>,
    sun: &SunPosition,
    landmark: &TargetLandmark,
    tolerance: f64,
    thresholds: &LightingThresholds,
) -> LandmarkAdvice {
    let bearing = user.bearing_to(&landmark.coordinate);
    let distance_m = user.distance_to(&landmark.coordinate);

    let Some(heading) = heading.filter(|h| h.is_finite()) else {
        return LandmarkAdvice {
            instruction: DirectorInstruction::new(
                "Calibrating…",
                "location.north.line",
                Severity::Gray,
                Priority::Low,
            ),
            bearing,
            distance_m,
            turn: None,
            lighting: None,
        };
    };

    let turn = relative_bearing(bearing, heading);
    if turn.abs() > tolerance {
        let (side, icon) = if turn > 0.0 {
            ("right", "arrow.turn.up.right")
        } else {
            ("left", "arrow.turn.up.left")
        };
        let text = format!("Turn {} {:.0}° toward {}", side, turn.abs(), landmark.name);
        return LandmarkAdvice {
            instruction: DirectorInstruction::new(text, icon, Severity::Orange, Priority::High),
            bearing,
            distance_m,
            turn: Some(turn),
            lighting: None,
        };
    }

    let lighting = evaluate_lighting(sun, Some(heading), LightingVariant::Strict, thresholds);
    let instruction = if lighting.is_urgent {
        DirectorInstruction::new(
            lighting.title.clone(),
            lighting.icon,
            lighting.severity,
            Priority::Critical,
        )
    } else {
        DirectorInstruction::new(
            format!("{} ahead: {}", landmark.name, lighting.title),
            lighting.icon,
            lighting.severity,
            Priority::Medium,
        )
    };

    LandmarkAdvice {
        instruction,
        bearing,
        distance_m,
        turn: Some(turn),
        lighting: Some(lighting),
    }
}
