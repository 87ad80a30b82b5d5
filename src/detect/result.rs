use serde::{Deserialize, Serialize};

use crate::expression::Expression;
use crate::geometry::{NormalizedPoint, NormalizedRect};

/// Published per-frame summary.
///
/// `is_person_detected` always equals `people_count > 0`; the constructor is the only
/// way to build one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    is_person_detected: bool,
    people_count: usize,
    expressions: Vec<Expression>,
    nose_point: Option<NormalizedPoint>,
}

impl DetectionResult {
    pub fn new(
        people_count: usize,
        expressions: Vec<Expression>,
        nose_point: Option<NormalizedPoint>,
    ) -> Self {
        Self {
            is_person_detected: people_count > 0,
            people_count,
            expressions,
            nose_point,
        }
    }

    /// Nothing in frame.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_person_detected(&self) -> bool {
        self.is_person_detected
    }

    pub fn people_count(&self) -> usize {
        self.people_count
    }

    /// Smoothed labels by face rank, largest face first. The list stops at the first
    /// face without a label, so a non-empty list always starts with the primary face.
    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    /// Expression of the primary (largest) face, if it was classified.
    pub fn primary_expression(&self) -> Option<Expression> {
        self.expressions.first().copied()
    }

    /// Primary subject reference point in preview space.
    pub fn nose_point(&self) -> Option<NormalizedPoint> {
        self.nose_point
    }
}

/// Facial landmark regions in face-local coordinates (0..1 within the face box,
/// bottom-left origin).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceLandmarks {
    pub nose_crest: Vec<NormalizedPoint>,
    pub nose: Vec<NormalizedPoint>,
    pub outer_lips: Vec<NormalizedPoint>,
}

impl FaceLandmarks {
    /// Points describing the nose, preferring the crest.
    pub fn nose_region(&self) -> Option<&[NormalizedPoint]> {
        if !self.nose_crest.is_empty() {
            Some(&self.nose_crest)
        } else if !self.nose.is_empty() {
            Some(&self.nose)
        } else {
            None
        }
    }
}

/// A detected face in detector space.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceObservation {
    /// Identifier stable across frames within a capture session, when the detector
    /// tracks faces.
    pub track_id: Option<u64>,
    pub bounds: NormalizedRect,
    pub confidence: f32,
    pub landmarks: Option<FaceLandmarks>,
}

impl FaceObservation {
    pub fn new(bounds: NormalizedRect) -> Self {
        Self {
            track_id: None,
            bounds,
            confidence: 1.0,
            landmarks: None,
        }
    }

    pub fn with_track_id(mut self, track_id: u64) -> Self {
        self.track_id = Some(track_id);
        self
    }

    pub fn with_landmarks(mut self, landmarks: FaceLandmarks) -> Self {
        self.landmarks = Some(landmarks);
        self
    }
}

/// A single body-pose joint in detector space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub point: NormalizedPoint,
    pub confidence: f32,
}

/// A detected body pose. Only the joints the pipeline consumes are kept.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PoseObservation {
    pub nose: Option<Keypoint>,
}

impl PoseObservation {
    pub fn with_nose(point: NormalizedPoint, confidence: f32) -> Self {
        Self {
            nose: Some(Keypoint { point, confidence }),
        }
    }
}
