//! Coordinate normalization.
//!
//! Detectors report points in their native space: normalized 0..1, origin at
//! the bottom-left of the sensor buffer, independent of how the device is
//! held. Everything downstream (overlays, the composition director) works in
//! *preview space*: normalized 0..1, origin top-left, in the orientation the
//! user sees on screen.
//!
//! The conversion is pure so it can be tested without any capture hardware.

use serde::{Deserialize, Serialize};

/// A point in normalized 0..1 coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub const CENTER: NormalizedPoint = NormalizedPoint { x: 0.5, y: 0.5 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Clamp both components into `[0, 1]`. Non-finite components become 0.
    pub fn clamped(self) -> Self {
        Self {
            x: clamp_unit(self.x),
            y: clamp_unit(self.y),
        }
    }

    pub fn distance_to(&self, other: &NormalizedPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned box in detector space (bottom-left origin, normalized).
///
/// `x`/`y` is the bottom-left corner, matching how detectors report boxes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area used to rank faces; degenerate or non-finite boxes rank last.
    pub fn area(&self) -> f64 {
        let area = self.width * self.height;
        if area.is_finite() && area > 0.0 {
            area
        } else {
            0.0
        }
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn mid_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Project a point given in box-local normalized coordinates into the
    /// detector's image space.
    pub fn project_point(&self, local: NormalizedPoint) -> NormalizedPoint {
        NormalizedPoint {
            x: self.x + local.x * self.width,
            y: self.y + local.y * self.height,
        }
    }
}

/// How the sensor buffer relates to the on-screen preview.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureOrientation {
    /// Device upright; the landscape sensor buffer is rotated 90° clockwise.
    #[default]
    Portrait,
    /// Device upside down; buffer rotated 90° counter-clockwise.
    PortraitUpsideDown,
    /// Buffer already matches the preview.
    LandscapeLeft,
    /// Buffer rotated 180°.
    LandscapeRight,
}

/// Map a detector-space point into preview space.
///
/// The vertical axis is inverted first (`y' = 1 - y`), then the rotation for
/// `orientation` is applied, then the horizontal mirror when `is_mirrored`.
/// The output is always clamped into `[0, 1]²`.
pub fn to_preview_space(
    point: NormalizedPoint,
    orientation: CaptureOrientation,
    is_mirrored: bool,
) -> NormalizedPoint {
    let x = clamp_unit(point.x);
    let y = 1.0 - clamp_unit(point.y);

    let (x, y) = match orientation {
        CaptureOrientation::Portrait => (1.0 - y, x),
        CaptureOrientation::PortraitUpsideDown => (y, 1.0 - x),
        CaptureOrientation::LandscapeLeft => (x, y),
        CaptureOrientation::LandscapeRight => (1.0 - x, 1.0 - y),
    };

    let x = if is_mirrored { 1.0 - x } else { x };

    NormalizedPoint::new(x, y).clamped()
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
