use anyhow::Result;

use crate::detect::backend::{ClassifierInput, ExpressionClassifier};
use crate::detect::result::FaceObservation;
use crate::expression::RawExpression;
use crate::frame::FrameView;
use crate::geometry::NormalizedPoint;

/// Mouth openness (height / width) above which the face reads as surprised.
const OPEN_MOUTH_RATIO: f64 = 0.6;
/// Corner lift (face-local units) that separates smiles and frowns from neutral.
const CORNER_LIFT: f64 = 0.02;
/// Minimum mouth width (fraction of face width) for a smile.
const SMILE_MIN_WIDTH: f64 = 0.4;

/// Model-free classifier reading the outer lip contour.
///
/// Works entirely from landmarks, so it is the fallback when no model-backed
/// classifier is registered.
#[derive(Default)]
pub struct MouthGeometryClassifier;

impl MouthGeometryClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionClassifier for MouthGeometryClassifier {
    fn name(&self) -> &'static str {
        "mouth-geometry"
    }

    fn supports(&self, input: ClassifierInput) -> bool {
        matches!(input, ClassifierInput::Landmarks)
    }

    fn classify(
        &mut self,
        _frame: &FrameView<'_>,
        face: &FaceObservation,
    ) -> Result<Option<RawExpression>> {
        let Some(lips) = face.landmarks.as_ref().map(|l| l.outer_lips.as_slice()) else {
            return Ok(None);
        };
        Ok(classify_lips(lips))
    }
}

fn classify_lips(lips: &[NormalizedPoint]) -> Option<RawExpression> {
    if lips.len() < 4 || lips.iter().any(|p| !p.is_finite()) {
        return None;
    }

    let left = lips.iter().min_by(|a, b| a.x.total_cmp(&b.x))?;
    let right = lips.iter().max_by(|a, b| a.x.total_cmp(&b.x))?;
    let top = lips.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    let bottom = lips.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);

    let width = right.x - left.x;
    if width <= f64::EPSILON {
        return None;
    }
    let openness = (top - bottom) / width;
    // Face-local y grows upward, so positive lift means corners above the mouth center.
    let lift = (left.y + right.y) / 2.0 - (top + bottom) / 2.0;

    let raw = if openness > OPEN_MOUTH_RATIO {
        RawExpression::new("surprise", 0.7)
    } else if lift > CORNER_LIFT && width > SMILE_MIN_WIDTH {
        RawExpression::new("happy", (0.65 + lift * 5.0).min(0.95) as f32)
    } else if lift < -CORNER_LIFT {
        RawExpression::new("sad", 0.65)
    } else {
        RawExpression::new("neutral", 0.8)
    };
    Some(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{Expression, MIN_EXPRESSION_CONFIDENCE};

    fn pts(raw: &[(f64, f64)]) -> Vec<NormalizedPoint> {
        raw.iter().map(|&(x, y)| NormalizedPoint::new(x, y)).collect()
    }

    fn label(lips: &[(f64, f64)]) -> Expression {
        classify_lips(&pts(lips))
            .map(|raw| raw.normalize(MIN_EXPRESSION_CONFIDENCE))
            .unwrap_or_default()
    }

    #[test]
    fn raised_corners_read_as_happy() {
        // Corners at y=0.30, lip center between 0.22 and 0.26.
        let lips = [(0.25, 0.30), (0.5, 0.26), (0.75, 0.30), (0.5, 0.22)];
        assert_eq!(label(&lips), Expression::Happy);
    }

    #[test]
    fn open_mouth_reads_as_surprised() {
        let lips = [(0.4, 0.25), (0.5, 0.40), (0.6, 0.25), (0.5, 0.10)];
        assert_eq!(label(&lips), Expression::Surprised);
    }

    #[test]
    fn dropped_corners_read_as_sad() {
        let lips = [(0.3, 0.18), (0.5, 0.26), (0.7, 0.18), (0.5, 0.22)];
        assert_eq!(label(&lips), Expression::Sad);
    }

    #[test]
    fn flat_mouth_reads_as_neutral() {
        let lips = [(0.3, 0.24), (0.5, 0.26), (0.7, 0.24), (0.5, 0.22)];
        assert_eq!(label(&lips), Expression::Neutral);
    }

    #[test]
    fn too_few_points_has_no_opinion() {
        assert!(classify_lips(&pts(&[(0.3, 0.2), (0.7, 0.2)])).is_none());
    }
}
