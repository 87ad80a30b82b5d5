use serde::{Deserialize, Serialize};

use crate::detect::DetectionResult;
use crate::director::{DirectorInstruction, Priority, Severity};
use crate::expression::Expression;
use crate::geometry::NormalizedPoint;

/// Roll (radians) beyond which an unlevel device gets a tilt instruction.
pub const DEFAULT_ROLL_THRESHOLD: f64 = 0.05;
/// Preview-space distance between nose and target that counts as framed.
pub const DEFAULT_FRAMING_TOLERANCE: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionThresholds {
    pub roll: f64,
    pub framing_tolerance: f64,
}

impl Default for CompositionThresholds {
    fn default() -> Self {
        Self {
            roll: DEFAULT_ROLL_THRESHOLD,
            framing_tolerance: DEFAULT_FRAMING_TOLERANCE,
        }
    }
}

/// Everything the composition director looks at.
#[derive(Clone, Copy, Debug)]
pub struct CompositionInputs<'a> {
    pub is_person_detected: bool,
    pub people_count: usize,
    pub nose_point: Option<NormalizedPoint>,
    pub target_point: NormalizedPoint,
    /// Signed device roll in radians; positive is clockwise.
    pub device_roll: f64,
    pub is_level: bool,
    pub expressions: &'a [Expression],
}

impl<'a> CompositionInputs<'a> {
    pub fn from_detection(
        result: &'a DetectionResult,
        target_point: NormalizedPoint,
        device_roll: f64,
        is_level: bool,
    ) -> Self {
        Self {
            is_person_detected: result.is_person_detected(),
            people_count: result.people_count(),
            nose_point: result.nose_point(),
            target_point,
            device_roll,
            is_level,
            expressions: result.expressions(),
        }
    }
}

type Rule = fn(&CompositionInputs<'_>, &CompositionThresholds) -> Option<DirectorInstruction>;

const RULES: [Rule; 5] = [level, find_subject, frame_subject, coach_expression, shoot];

/// Pick the single instruction for the current frame. The first matching rule wins.
pub fn direct_composition(
    inputs: &CompositionInputs<'_>,
    thresholds: &CompositionThresholds,
) -> DirectorInstruction {
    RULES
        .iter()
        .find_map(|rule| rule(inputs, thresholds))
        .unwrap_or_else(perfect)
}

fn level(inputs: &CompositionInputs<'_>, thresholds: &CompositionThresholds) -> Option<DirectorInstruction> {
    if inputs.is_level || !inputs.device_roll.is_finite() {
        return None;
    }
    // Inside the band while reported unlevel: fall through.
    if inputs.device_roll > thresholds.roll {
        Some(DirectorInstruction::new(
            "Tilt Left",
            "arrow.counterclockwise",
            Severity::Red,
            Priority::Critical,
        ))
    } else if inputs.device_roll < -thresholds.roll {
        Some(DirectorInstruction::new(
            "Tilt Right",
            "arrow.clockwise",
            Severity::Red,
            Priority::Critical,
        ))
    } else {
        None
    }
}

fn find_subject(inputs: &CompositionInputs<'_>, _: &CompositionThresholds) -> Option<DirectorInstruction> {
    if inputs.is_person_detected {
        return None;
    }
    Some(DirectorInstruction::new(
        "Find your Subject",
        "person.fill.questionmark",
        Severity::Orange,
        Priority::High,
    ))
}

fn frame_subject(inputs: &CompositionInputs<'_>, thresholds: &CompositionThresholds) -> Option<DirectorInstruction> {
    let nose = inputs.nose_point.filter(NormalizedPoint::is_finite)?;
    let target = inputs.target_point;
    if !target.is_finite() || nose.distance_to(&target) <= thresholds.framing_tolerance {
        return None;
    }

    // Preview space has a top-left origin: positive dy means the subject sits low.
    let dx = nose.x - target.x;
    let dy = nose.y - target.y;
    let (text, icon) = if dx.abs() >= dy.abs() {
        if dx > 0.0 {
            ("Pan Right", "arrow.right")
        } else {
            ("Pan Left", "arrow.left")
        }
    } else if dy > 0.0 {
        ("Tilt Down", "arrow.down")
    } else {
        ("Tilt Up", "arrow.up")
    };
    Some(DirectorInstruction::new(text, icon, Severity::Yellow, Priority::Medium))
}

fn coach_expression(inputs: &CompositionInputs<'_>, _: &CompositionThresholds) -> Option<DirectorInstruction> {
    let primary = inputs.expressions.first()?;
    if !primary.wants_coaching() {
        return None;
    }
    Some(DirectorInstruction::new(
        "Make her laugh!",
        "face.smiling",
        Severity::Blue,
        Priority::Low,
    ))
}

fn shoot(_: &CompositionInputs<'_>, _: &CompositionThresholds) -> Option<DirectorInstruction> {
    Some(perfect())
}

fn perfect() -> DirectorInstruction {
    DirectorInstruction::new("Perfect! Shoot!", "camera.fill", Severity::Green, Priority::High)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs<'a>(expressions: &'a [Expression]) -> CompositionInputs<'a> {
        CompositionInputs {
            is_person_detected: true,
            people_count: 1,
            nose_point: Some(NormalizedPoint::CENTER),
            target_point: NormalizedPoint::CENTER,
            device_roll: 0.0,
            is_level: true,
            expressions,
        }
    }

    fn text(inputs: &CompositionInputs<'_>) -> String {
        direct_composition(inputs, &CompositionThresholds::default()).text
    }

    #[test]
    fn unlevel_positive_roll_tilts_left() {
        let happy = [Expression::Happy];
        let mut i = inputs(&happy);
        i.is_level = false;
        i.device_roll = 0.2;
        let instruction = direct_composition(&i, &CompositionThresholds::default());
        assert_eq!(instruction.text, "Tilt Left");
        assert_eq!(instruction.priority, Priority::Critical);

        i.device_roll = -0.2;
        assert_eq!(text(&i), "Tilt Right");
    }

    #[test]
    fn unlevel_inside_band_falls_through() {
        let happy = [Expression::Happy];
        let mut i = inputs(&happy);
        i.is_level = false;
        i.device_roll = 0.01;
        assert_eq!(text(&i), "Perfect! Shoot!");

        i.device_roll = f64::NAN;
        assert_eq!(text(&i), "Perfect! Shoot!");
    }

    #[test]
    fn no_subject_regardless_of_other_inputs() {
        let happy = [Expression::Happy];
        let mut i = inputs(&happy);
        i.is_person_detected = false;
        i.people_count = 0;
        i.nose_point = Some(NormalizedPoint::new(0.9, 0.9));
        assert_eq!(text(&i), "Find your Subject");
    }

    #[test]
    fn framing_picks_dominant_axis() {
        let happy = [Expression::Happy];
        let mut i = inputs(&happy);

        i.nose_point = Some(NormalizedPoint::new(0.8, 0.55));
        assert_eq!(text(&i), "Pan Right");
        i.nose_point = Some(NormalizedPoint::new(0.2, 0.45));
        assert_eq!(text(&i), "Pan Left");
        i.nose_point = Some(NormalizedPoint::new(0.52, 0.9));
        assert_eq!(text(&i), "Tilt Down");
        i.nose_point = Some(NormalizedPoint::new(0.48, 0.1));
        assert_eq!(text(&i), "Tilt Up");
    }

    #[test]
    fn within_tolerance_counts_as_framed() {
        let happy = [Expression::Happy];
        let mut i = inputs(&happy);
        i.nose_point = Some(NormalizedPoint::new(0.53, 0.53));
        assert_eq!(text(&i), "Perfect! Shoot!");
    }

    #[test]
    fn non_finite_nose_skips_framing() {
        let happy = [Expression::Happy];
        let mut i = inputs(&happy);
        i.nose_point = Some(NormalizedPoint::new(f64::NAN, 0.1));
        assert_eq!(text(&i), "Perfect! Shoot!");
    }

    #[test]
    fn coaches_flat_expressions() {
        for expression in [Expression::Neutral, Expression::Sad, Expression::Angry] {
            let labels = [expression];
            assert_eq!(text(&inputs(&labels)), "Make her laugh!");
        }
        let labels = [Expression::Surprised];
        assert_eq!(text(&inputs(&labels)), "Perfect! Shoot!");
    }

    #[test]
    fn only_primary_face_is_coached() {
        let labels = [Expression::Happy, Expression::Sad];
        assert_eq!(text(&inputs(&labels)), "Perfect! Shoot!");
    }

    #[test]
    fn no_expressions_means_no_opinion() {
        let i = inputs(&[]);
        let instruction = direct_composition(&i, &CompositionThresholds::default());
        assert_eq!(instruction.text, "Perfect! Shoot!");
        assert_eq!(instruction.severity, Severity::Green);
    }

    #[test]
    fn builds_from_detection_result() {
        let result = DetectionResult::new(1, vec![Expression::Happy], Some(NormalizedPoint::CENTER));
        let i = CompositionInputs::from_detection(&result, NormalizedPoint::CENTER, 0.0, true);
        assert_eq!(text(&i), "Perfect! Shoot!");
    }
}
