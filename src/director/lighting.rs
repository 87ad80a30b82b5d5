//! Sun-relative lighting advice.
//!
//! Two variants share `relative_bearing`:
//! - `Evaluate`: buckets the sun's bearing relative to the camera into front, side,
//!   transition and back light, with golden hour as an upgrade.
//! - `Strict`: the landmark "photo director" rules. Facing the sun or a high sun is
//!   urgent; anything else gets a 0-100 score.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::director::Severity;
use crate::geo::relative_bearing;
use crate::solar::SunPosition;

/// Relative bearing that side light is steered toward.
const IDEAL_SIDE_ANGLE: f64 = 45.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightingVariant {
    #[default]
    Evaluate,
    Strict,
}

impl LightingVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            LightingVariant::Evaluate => "evaluate",
            LightingVariant::Strict => "strict",
        }
    }
}

impl fmt::Display for LightingVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LightingVariant {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "evaluate" => Ok(LightingVariant::Evaluate),
            "strict" | "photo_director" => Ok(LightingVariant::Strict),
            other => bail!("unknown lighting variant '{}'", other),
        }
    }
}

/// Bucket edges in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingThresholds {
    /// Evaluate: below this elevation the sun is treated as set.
    pub low_light_elevation: f64,
    /// Evaluate: `|rel|` below this is front light.
    pub front_max: f64,
    /// Evaluate: `|rel|` up to this is side light.
    pub side_max: f64,
    /// Evaluate: `|rel|` up to this is the transition zone; beyond is backlight.
    pub transition_max: f64,
    /// Strict: below this elevation the sun is treated as set.
    pub strict_horizon_elevation: f64,
    /// Strict: `|rel|` below this is shooting into the sun.
    pub strict_sun_cone: f64,
    /// Strict: above this elevation the sun is too high.
    pub strict_max_elevation: f64,
}

impl Default for LightingThresholds {
    fn default() -> Self {
        Self {
            low_light_elevation: -2.0,
            front_max: 20.0,
            side_max: 70.0,
            transition_max: 110.0,
            strict_horizon_elevation: 0.0,
            strict_sun_cone: 45.0,
            strict_max_elevation: 60.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LightingKind {
    Calibrating,
    LowLight,
    FrontLight,
    SideLight,
    Transition,
    Backlight,
    IntoSun,
    SunTooHigh,
    Scored,
}

/// Lighting recommendation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LightingAdvice {
    pub kind: LightingKind,
    pub title: String,
    pub detail: String,
    pub icon: &'static str,
    pub severity: Severity,
    /// 0-100.
    pub score: u8,
    pub is_golden_hour: bool,
    pub is_urgent: bool,
    /// Sun azimuth relative to the heading, `(-180, 180]`, when known.
    pub relative_bearing: Option<f64>,
    /// Suggested rotation in degrees; positive turns right (clockwise).
    pub turn: Option<f64>,
}

impl LightingAdvice {
    /// Heading (or sun position) not yet known.
    pub fn calibrating() -> Self {
        Self {
            kind: LightingKind::Calibrating,
            title: "Calibrating…".to_string(),
            detail: "Move the phone in a figure eight to settle the compass".to_string(),
            icon: "location.north.line",
            severity: Severity::Gray,
            score: 0,
            is_golden_hour: false,
            is_urgent: false,
            relative_bearing: None,
            turn: None,
        }
    }

    /// Human-readable turn hint, if any.
    pub fn turn_hint(&self) -> Option<String> {
        let turn = self.turn?;
        if turn.abs() < 1.0 {
            return None;
        }
        let side = if turn > 0.0 { "right" } else { "left" };
        Some(format!("Turn {} {:.0}°", side, turn.abs()))
    }
}

/// Evaluate lighting for a sun position and (smoothed) heading.
pub fn evaluate_lighting(
    sun: &SunPosition,
    heading: Option<f64>,
    variant: LightingVariant,
    thresholds: &LightingThresholds,
) -> LightingAdvice {
    let Some(heading) = heading.filter(|h| h.is_finite()) else {
        return LightingAdvice::calibrating();
    };
    if !sun.is_finite() {
        return LightingAdvice::calibrating();
    }
    let rel = relative_bearing(sun.azimuth, heading);
    match variant {
        LightingVariant::Evaluate => evaluate(sun, rel, thresholds),
        LightingVariant::Strict => strict(sun, rel, thresholds),
    }
}

fn evaluate(sun: &SunPosition, rel: f64, thresholds: &LightingThresholds) -> LightingAdvice {
    if sun.elevation < thresholds.low_light_elevation {
        return low_light(sun, rel);
    }

    let angle = rel.abs();
    let (kind, title, detail, icon, score) = if angle < thresholds.front_max {
        (
            LightingKind::FrontLight,
            "Front light",
            "Flat, even light; turn a little for more shape",
            "sun.max",
            60,
        )
    } else if angle <= thresholds.side_max {
        (
            LightingKind::SideLight,
            "Side light",
            "Hold this angle",
            "sun.and.horizon",
            90,
        )
    } else if angle <= thresholds.transition_max {
        (
            LightingKind::Transition,
            "Transition light",
            "Angle for better light",
            "arrow.triangle.2.circlepath",
            70,
        )
    } else {
        (
            LightingKind::Backlight,
            "Backlight",
            "Expose for the face or add fill light",
            "sun.haze",
            40,
        )
    };

    let turn = (kind != LightingKind::SideLight).then(|| turn_toward_side_light(rel));
    let (title, score) = if sun.is_golden_hour {
        (format!("Golden hour {}", title.to_lowercase()), 100)
    } else {
        (title.to_string(), score)
    };

    LightingAdvice {
        kind,
        title,
        detail: detail.to_string(),
        icon,
        severity: Severity::for_score(score),
        score,
        is_golden_hour: sun.is_golden_hour,
        is_urgent: false,
        relative_bearing: Some(rel),
        turn,
    }
}

fn strict(sun: &SunPosition, rel: f64, thresholds: &LightingThresholds) -> LightingAdvice {
    if sun.elevation < thresholds.strict_horizon_elevation {
        return low_light(sun, rel);
    }

    let angle = rel.abs();
    if angle < thresholds.strict_sun_cone {
        let turn = if rel >= 0.0 { rel - 180.0 } else { rel + 180.0 };
        return LightingAdvice {
            kind: LightingKind::IntoSun,
            title: "Shooting into the sun".to_string(),
            detail: "Turn around so the sun is behind you".to_string(),
            icon: "exclamationmark.triangle.fill",
            severity: Severity::Red,
            score: 0,
            is_golden_hour: sun.is_golden_hour,
            is_urgent: true,
            relative_bearing: Some(rel),
            turn: Some(turn),
        };
    }
    if sun.elevation > thresholds.strict_max_elevation {
        return LightingAdvice {
            kind: LightingKind::SunTooHigh,
            title: "Sun too high".to_string(),
            detail: "Harsh overhead light; find shade".to_string(),
            icon: "sun.max.trianglebadge.exclamationmark",
            severity: Severity::Red,
            score: 20,
            is_golden_hour: sun.is_golden_hour,
            is_urgent: true,
            relative_bearing: Some(rel),
            turn: None,
        };
    }

    let bearing_part = ((angle - thresholds.strict_sun_cone)
        / (180.0 - thresholds.strict_sun_cone))
        .clamp(0.0, 1.0);
    let elevation_part = (1.0 - sun.elevation / thresholds.strict_max_elevation).clamp(0.0, 1.0);
    let score = if sun.is_golden_hour {
        100
    } else {
        (60.0 * bearing_part + 40.0 * elevation_part).round().clamp(0.0, 100.0) as u8
    };
    let severity = Severity::for_score(score);
    let (title, detail) = match severity {
        Severity::Green => ("Good light", "Sun behind you at a low angle"),
        Severity::Yellow => ("Fair light", "Workable; a lower sun or wider angle helps"),
        _ => ("Poor light", "Reposition or wait for better light"),
    };

    LightingAdvice {
        kind: LightingKind::Scored,
        title: title.to_string(),
        detail: detail.to_string(),
        icon: "camera.aperture",
        severity,
        score,
        is_golden_hour: sun.is_golden_hour,
        is_urgent: false,
        relative_bearing: Some(rel),
        turn: None,
    }
}

fn low_light(sun: &SunPosition, rel: f64) -> LightingAdvice {
    LightingAdvice {
        kind: LightingKind::LowLight,
        title: "Low light".to_string(),
        detail: "The sun has set; steady the phone or find a light source".to_string(),
        icon: "moon.stars",
        severity: Severity::Blue,
        score: 10,
        is_golden_hour: sun.is_golden_hour,
        is_urgent: false,
        relative_bearing: Some(rel),
        turn: None,
    }
}

/// Rotation that puts the sun at 45° to the nearer side of the lens axis.
fn turn_toward_side_light(rel: f64) -> f64 {
    if rel >= 0.0 {
        rel - IDEAL_SIDE_ANGLE
    } else {
        rel + IDEAL_SIDE_ANGLE
    }
}
