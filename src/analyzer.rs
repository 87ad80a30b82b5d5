//! One inference pass: frame in, `DetectionResult` out.
//!
//! The analyzer is synchronous and owns all per-session state (face label buffers,
//! classification cadence). `engine::VisionEngine` runs it on a worker thread; tests
//! and offline tools can drive it directly.

use std::cmp::Ordering;

use crate::detect::{
    DetectionResult, FaceObservation, PoseObservation, SharedClassifier, VisionBackend,
};
use crate::expression::{Expression, MIN_EXPRESSION_CONFIDENCE};
use crate::frame::FrameView;
use crate::geometry::{to_preview_space, CaptureOrientation, NormalizedPoint};
use crate::label_buffer::{LabelBufferMap, DEFAULT_LABEL_WINDOW, DEFAULT_MAX_TRACKED};

/// Pose nose keypoints at or below this confidence are ignored.
pub const MIN_POSE_NOSE_CONFIDENCE: f32 = 0.2;

/// Fraction of the face box height, measured from the top, where the nose sits.
const NOSE_DEPTH_IN_FACE: f64 = 0.6;

/// Tunables for the inference pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    /// Only every Nth submitted frame is analyzed.
    pub frame_interval: u32,
    /// Faces classified per pass, largest first.
    pub max_faces_to_classify: usize,
    /// Classify on every Nth analyzed frame; other passes reuse smoothed labels.
    pub expression_interval: u32,
    /// Rolling window per face.
    pub label_window: usize,
    /// Bound on tracked face identities.
    pub max_tracked_faces: usize,
    pub min_expression_confidence: f32,
    pub min_pose_nose_confidence: f32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            frame_interval: 3,
            max_faces_to_classify: 2,
            expression_interval: 1,
            label_window: DEFAULT_LABEL_WINDOW,
            max_tracked_faces: DEFAULT_MAX_TRACKED,
            min_expression_confidence: MIN_EXPRESSION_CONFIDENCE,
            min_pose_nose_confidence: MIN_POSE_NOSE_CONFIDENCE,
        }
    }
}

/// Identity used to key label buffers.
///
/// Detectors without tracking fall back to the face's size rank in the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FaceKey {
    Tracked(u64),
    Rank(usize),
}

struct NoseContext<'a> {
    primary: Option<&'a FaceObservation>,
    poses: &'a [PoseObservation],
    orientation: CaptureOrientation,
    is_mirrored: bool,
    min_pose_confidence: f32,
}

type NoseStrategy = fn(&NoseContext<'_>) -> Option<NormalizedPoint>;

/// Nose point sources, most precise first.
const NOSE_STRATEGIES: [NoseStrategy; 3] = [nose_from_landmarks, nose_from_face_box, nose_from_pose];

fn nose_from_landmarks(ctx: &NoseContext<'_>) -> Option<NormalizedPoint> {
    let face = ctx.primary?;
    let region = face.landmarks.as_ref()?.nose_region()?;
    let finite: Vec<&NormalizedPoint> = region.iter().filter(|p| p.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    let n = finite.len() as f64;
    let local = NormalizedPoint::new(
        finite.iter().map(|p| p.x).sum::<f64>() / n,
        finite.iter().map(|p| p.y).sum::<f64>() / n,
    );
    let image = face.bounds.project_point(local);
    Some(to_preview_space(image, ctx.orientation, ctx.is_mirrored))
}

fn nose_from_face_box(ctx: &NoseContext<'_>) -> Option<NormalizedPoint> {
    let face = ctx.primary?;
    let bounds = face.bounds;
    if bounds.area() <= 0.0 || !bounds.x.is_finite() || !bounds.y.is_finite() {
        return None;
    }
    // Detector space is bottom-left origin: the top of the box is max_y.
    let image = NormalizedPoint::new(
        bounds.mid_x(),
        bounds.max_y() - NOSE_DEPTH_IN_FACE * bounds.height,
    );
    Some(to_preview_space(image, ctx.orientation, ctx.is_mirrored))
}

fn nose_from_pose(ctx: &NoseContext<'_>) -> Option<NormalizedPoint> {
    ctx.poses
        .iter()
        .filter_map(|pose| pose.nose)
        .find(|nose| nose.confidence > ctx.min_pose_confidence && nose.point.is_finite())
        .map(|nose| to_preview_space(nose.point, ctx.orientation, ctx.is_mirrored))
}

/// Synchronous per-frame pipeline.
pub struct FrameAnalyzer {
    backend: Box<dyn VisionBackend>,
    classifier: Option<SharedClassifier>,
    tracks: LabelBufferMap<FaceKey, Expression>,
    settings: EngineSettings,
    passes: u64,
}

impl FrameAnalyzer {
    pub fn new(
        backend: Box<dyn VisionBackend>,
        classifier: Option<SharedClassifier>,
        settings: EngineSettings,
    ) -> Self {
        let tracks = LabelBufferMap::new(settings.label_window, settings.max_tracked_faces);
        Self {
            backend,
            classifier,
            tracks,
            settings,
            passes: 0,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub(crate) fn warm_up(&mut self) -> anyhow::Result<()> {
        self.backend.warm_up()
    }

    /// Smoothed label currently held for `key`.
    pub fn tracked_expression(&self, key: &FaceKey) -> Option<Expression> {
        self.tracks.current(key)
    }

    /// Run pose, face and expression inference on one frame.
    ///
    /// Detector failures are logged and treated as "nothing detected"; this never
    /// fails.
    pub fn analyze(&mut self, frame: &FrameView<'_>) -> DetectionResult {
        self.passes += 1;

        let poses = self.backend.detect_poses(frame).unwrap_or_else(|err| {
            log::debug!("pose detection failed on frame {}: {}", frame.sequence(), err);
            Vec::new()
        });
        let faces = self.backend.detect_faces(frame).unwrap_or_else(|err| {
            log::debug!("face detection failed on frame {}: {}", frame.sequence(), err);
            Vec::new()
        });

        let people_count = poses.len().max(faces.len());
        let ranked = rank_by_area(&faces);

        let ctx = NoseContext {
            primary: ranked.first().map(|&(_, face)| face),
            poses: &poses,
            orientation: frame.orientation(),
            is_mirrored: frame.is_mirrored(),
            min_pose_confidence: self.settings.min_pose_nose_confidence,
        };
        let nose_point = NOSE_STRATEGIES.iter().find_map(|strategy| strategy(&ctx));

        let expressions = self.expressions(frame, &ranked);

        DetectionResult::new(people_count, expressions, nose_point)
    }

    fn expressions(
        &mut self,
        frame: &FrameView<'_>,
        ranked: &[(usize, &FaceObservation)],
    ) -> Vec<Expression> {
        let Some(classifier) = self.classifier.clone() else {
            return Vec::new();
        };
        let interval = u64::from(self.settings.expression_interval.max(1));
        let classify_now = (self.passes - 1) % interval == 0;

        // Labels stay positional: expressions[i] belongs to the i-th largest face, so
        // the list ends at the first face that has no label.
        let mut expressions = Vec::new();
        for (rank, &(_, face)) in ranked
            .iter()
            .take(self.settings.max_faces_to_classify)
            .enumerate()
        {
            let key = match face.track_id {
                Some(id) => FaceKey::Tracked(id),
                None => FaceKey::Rank(rank),
            };

            let label = if classify_now {
                self.classify(&classifier, frame, face, key)
            } else {
                self.tracks.current(&key)
            };
            match label {
                Some(label) => expressions.push(label),
                None => break,
            }
        }
        expressions
    }

    fn classify(
        &mut self,
        classifier: &SharedClassifier,
        frame: &FrameView<'_>,
        face: &FaceObservation,
        key: FaceKey,
    ) -> Option<Expression> {
        let raw = match classifier.lock() {
            Ok(mut guard) => guard.classify(frame, face),
            Err(_) => {
                log::warn!("expression classifier lock poisoned; skipping classification");
                return None;
            }
        };
        match raw {
            Ok(Some(raw)) => {
                let label = raw.normalize(self.settings.min_expression_confidence);
                Some(self.tracks.push(key, label))
            }
            Ok(None) => None,
            Err(err) => {
                log::debug!(
                    "expression classification failed on frame {}: {}",
                    frame.sequence(),
                    err
                );
                None
            }
        }
    }
}

/// Faces ordered by box area, largest first. Equal areas keep detector order.
fn rank_by_area(faces: &[FaceObservation]) -> Vec<(usize, &FaceObservation)> {
    let mut ranked: Vec<(usize, &FaceObservation)> = faces.iter().enumerate().collect();
    ranked.sort_by(|a, b| {
        b.1.bounds
            .area()
            .partial_cmp(&a.1.bounds.area())
            .unwrap_or(Ordering::Equal)
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{
        ClassifierRegistry, FaceLandmarks, MouthGeometryClassifier, Scene, ScriptedBackend,
    };
    use crate::expression::RawExpression;
    use crate::frame::Frame;
    use crate::geometry::NormalizedRect;
    use std::sync::{Arc, Mutex};

    fn frame(sequence: u64) -> Frame {
        Frame::new(vec![0u8; 3], 1, 1, sequence, CaptureOrientation::LandscapeLeft, false)
    }

    fn analyzer(scenes: Vec<Scene>, settings: EngineSettings) -> FrameAnalyzer {
        let backend = ScriptedBackend::new(scenes);
        let classifier: SharedClassifier = Arc::new(Mutex::new(backend.classifier()));
        FrameAnalyzer::new(Box::new(backend), Some(classifier), settings)
    }

    fn close(p: NormalizedPoint, x: f64, y: f64) -> bool {
        (p.x - x).abs() < 1e-9 && (p.y - y).abs() < 1e-9
    }

    #[test]
    fn empty_scene_reports_nobody() {
        let mut a = analyzer(vec![Scene::empty()], EngineSettings::default());
        let result = a.analyze(&frame(0).view());
        assert_eq!(result, DetectionResult::empty());
    }

    #[test]
    fn people_count_is_max_of_pose_and_face() {
        let scene = Scene::empty()
            .with_pose(PoseObservation::default())
            .with_pose(PoseObservation::default())
            .with_face(FaceObservation::new(NormalizedRect::new(0.1, 0.1, 0.1, 0.1)), None);
        let mut a = analyzer(vec![scene], EngineSettings::default());
        let result = a.analyze(&frame(0).view());
        assert_eq!(result.people_count(), 2);
        assert!(result.is_person_detected());
    }

    #[test]
    fn landmark_nose_wins_over_box_heuristic() {
        let face = FaceObservation::new(NormalizedRect::new(0.2, 0.2, 0.4, 0.4)).with_landmarks(
            FaceLandmarks {
                nose_crest: vec![NormalizedPoint::new(0.4, 0.5), NormalizedPoint::new(0.6, 0.5)],
                ..FaceLandmarks::default()
            },
        );
        let mut a = analyzer(vec![Scene::empty().with_face(face, None)], EngineSettings::default());
        let nose = a.analyze(&frame(0).view()).nose_point().unwrap();
        // Local (0.5, 0.5) -> image (0.4, 0.4) -> preview (0.4, 0.6).
        assert!(close(nose, 0.4, 0.6), "{nose:?}");
    }

    #[test]
    fn face_box_heuristic_sits_sixty_percent_down() {
        let face = FaceObservation::new(NormalizedRect::new(0.2, 0.2, 0.4, 0.5));
        let mut a = analyzer(vec![Scene::empty().with_face(face, None)], EngineSettings::default());
        let nose = a.analyze(&frame(0).view()).nose_point().unwrap();
        // Top of box in preview space is 1 - 0.7 = 0.3; 60% of 0.5 below that is 0.6.
        assert!(close(nose, 0.4, 0.6), "{nose:?}");
    }

    #[test]
    fn pose_nose_requires_confidence() {
        let weak = Scene::empty().with_pose(PoseObservation::with_nose(NormalizedPoint::new(0.3, 0.3), 0.2));
        let strong =
            Scene::empty().with_pose(PoseObservation::with_nose(NormalizedPoint::new(0.3, 0.3), 0.9));
        let mut a = analyzer(vec![weak, strong], EngineSettings::default());

        let r0 = a.analyze(&frame(0).view());
        assert!(r0.is_person_detected());
        assert_eq!(r0.nose_point(), None);

        let r1 = a.analyze(&frame(1).view());
        assert!(close(r1.nose_point().unwrap(), 0.3, 0.7));
    }

    #[test]
    fn classifies_largest_faces_first_up_to_limit() {
        let small = FaceObservation::new(NormalizedRect::new(0.0, 0.0, 0.1, 0.1)).with_track_id(1);
        let large = FaceObservation::new(NormalizedRect::new(0.5, 0.5, 0.3, 0.3)).with_track_id(2);
        let medium = FaceObservation::new(NormalizedRect::new(0.3, 0.3, 0.2, 0.2)).with_track_id(3);
        let scene = Scene::empty()
            .with_face(small, Some(RawExpression::new("sad", 0.9)))
            .with_face(large, Some(RawExpression::new("happy", 0.9)))
            .with_face(medium, Some(RawExpression::new("surprise", 0.9)));
        let mut a = analyzer(vec![scene], EngineSettings::default());
        let result = a.analyze(&frame(0).view());
        assert_eq!(result.people_count(), 3);
        assert_eq!(
            result.expressions(),
            &[Expression::Happy, Expression::Surprised]
        );
        assert_eq!(a.tracked_expression(&FaceKey::Tracked(1)), None);
    }

    #[test]
    fn unlabeled_primary_face_yields_no_labels() {
        let large = FaceObservation::new(NormalizedRect::new(0.3, 0.3, 0.4, 0.4)).with_track_id(1);
        let small = FaceObservation::new(NormalizedRect::new(0.0, 0.0, 0.05, 0.05)).with_track_id(2);
        let scene = Scene::empty()
            .with_face(small, Some(RawExpression::new("sad", 0.9)))
            .with_face(large, None);
        let mut a = analyzer(vec![scene], EngineSettings::default());
        let result = a.analyze(&frame(0).view());
        assert_eq!(result.people_count(), 2);
        assert!(result.expressions().is_empty());
        assert_eq!(result.primary_expression(), None);
        assert_eq!(a.tracked_expression(&FaceKey::Tracked(2)), None);
    }

    #[test]
    fn low_confidence_labels_smooth_as_neutral() {
        let face = FaceObservation::new(NormalizedRect::new(0.4, 0.4, 0.2, 0.2)).with_track_id(7);
        let scene = Scene::empty().with_face(face, Some(RawExpression::new("happy", 0.4)));
        let mut a = analyzer(vec![scene], EngineSettings::default());
        let result = a.analyze(&frame(0).view());
        assert_eq!(result.expressions(), &[Expression::Neutral]);
    }

    #[test]
    fn expression_interval_reuses_smoothed_labels() {
        let face = FaceObservation::new(NormalizedRect::new(0.4, 0.4, 0.2, 0.2)).with_track_id(7);
        let happy = Scene::empty().with_face(face.clone(), Some(RawExpression::new("happy", 0.9)));
        let sad = Scene::empty().with_face(face, Some(RawExpression::new("sad", 0.9)));
        let settings = EngineSettings {
            expression_interval: 2,
            ..EngineSettings::default()
        };
        let mut a = analyzer(vec![happy, sad], settings);
        assert_eq!(a.analyze(&frame(0).view()).expressions(), &[Expression::Happy]);
        // Second pass does not classify, so the sad label is never seen.
        assert_eq!(a.analyze(&frame(1).view()).expressions(), &[Expression::Happy]);
        let buffer_len = a.tracks.buffer(&FaceKey::Tracked(7)).map(|b| b.len());
        assert_eq!(buffer_len, Some(1));
    }

    #[test]
    fn detector_failure_reads_as_empty() {
        let mut a = analyzer(vec![Scene::failing()], EngineSettings::default());
        assert_eq!(a.analyze(&frame(0).view()), DetectionResult::empty());
    }

    #[test]
    fn no_classifier_means_no_expressions() {
        let face = FaceObservation::new(NormalizedRect::new(0.4, 0.4, 0.2, 0.2));
        let backend = ScriptedBackend::new(vec![
            Scene::empty().with_face(face, Some(RawExpression::new("happy", 0.9))),
        ]);
        let mut a = FrameAnalyzer::new(Box::new(backend), None, EngineSettings::default());
        let result = a.analyze(&frame(0).view());
        assert!(result.is_person_detected());
        assert!(result.expressions().is_empty());
    }

    #[test]
    fn geometry_classifier_from_registry() {
        let face = FaceObservation::new(NormalizedRect::new(0.3, 0.3, 0.4, 0.4)).with_landmarks(
            FaceLandmarks {
                outer_lips: vec![
                    NormalizedPoint::new(0.25, 0.30),
                    NormalizedPoint::new(0.5, 0.26),
                    NormalizedPoint::new(0.75, 0.30),
                    NormalizedPoint::new(0.5, 0.22),
                ],
                ..FaceLandmarks::default()
            },
        );
        let mut registry = ClassifierRegistry::new();
        registry.register(MouthGeometryClassifier::new());
        let classifier = registry.select(None).unwrap();
        let backend = ScriptedBackend::new(vec![Scene::empty().with_face(face, None)]);
        let mut a = FrameAnalyzer::new(Box::new(backend), classifier, EngineSettings::default());
        assert_eq!(a.analyze(&frame(0).view()).expressions(), &[Expression::Happy]);
    }
}
