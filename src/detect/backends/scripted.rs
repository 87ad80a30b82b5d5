use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::detect::backend::{ClassifierInput, ExpressionClassifier, VisionBackend};
use crate::detect::result::{FaceObservation, PoseObservation};
use crate::expression::RawExpression;
use crate::frame::FrameView;

/// What the scripted detector "sees" in one frame.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub poses: Vec<PoseObservation>,
    pub faces: Vec<ScriptedFace>,
    /// Make every detector call for this frame fail.
    pub fail: bool,
}

impl Scene {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_face(mut self, observation: FaceObservation, expression: Option<RawExpression>) -> Self {
        self.faces.push(ScriptedFace {
            observation,
            expression,
        });
        self
    }

    pub fn with_pose(mut self, pose: PoseObservation) -> Self {
        self.poses.push(pose);
        self
    }
}

/// A face plus the label the scripted classifier reports for it.
#[derive(Clone, Debug)]
pub struct ScriptedFace {
    pub observation: FaceObservation,
    pub expression: Option<RawExpression>,
}

/// Replays a fixed list of scenes keyed by frame sequence number.
///
/// Scene `i` applies to the frame with sequence `i`; later frames repeat the last
/// scene. Used by the demo binary and tests in place of a platform detector.
pub struct ScriptedBackend {
    scenes: Arc<Vec<Scene>>,
    delay: Duration,
}

impl ScriptedBackend {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self {
            scenes: Arc::new(scenes),
            delay: Duration::ZERO,
        }
    }

    /// Simulate inference latency on each face pass.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Classifier reading labels from the same script.
    pub fn classifier(&self) -> ScriptedClassifier {
        ScriptedClassifier {
            scenes: self.scenes.clone(),
        }
    }
}

fn scene_for(scenes: &[Scene], sequence: u64) -> Option<&Scene> {
    let index = usize::try_from(sequence).unwrap_or(usize::MAX);
    scenes.get(index).or_else(|| scenes.last())
}

impl VisionBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect_poses(&mut self, frame: &FrameView<'_>) -> Result<Vec<PoseObservation>> {
        match scene_for(&self.scenes, frame.sequence()) {
            Some(scene) if scene.fail => Err(anyhow!("scripted pose failure")),
            Some(scene) => Ok(scene.poses.clone()),
            None => Ok(Vec::new()),
        }
    }

    fn detect_faces(&mut self, frame: &FrameView<'_>) -> Result<Vec<FaceObservation>> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        match scene_for(&self.scenes, frame.sequence()) {
            Some(scene) if scene.fail => Err(anyhow!("scripted face failure")),
            Some(scene) => Ok(scene
                .faces
                .iter()
                .map(|face| face.observation.clone())
                .collect()),
            None => Ok(Vec::new()),
        }
    }
}

/// Reports the label scripted for the matching face.
pub struct ScriptedClassifier {
    scenes: Arc<Vec<Scene>>,
}

impl ExpressionClassifier for ScriptedClassifier {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn supports(&self, input: ClassifierInput) -> bool {
        matches!(input, ClassifierInput::FacePixels)
    }

    fn classify(
        &mut self,
        frame: &FrameView<'_>,
        face: &FaceObservation,
    ) -> Result<Option<RawExpression>> {
        let Some(scene) = scene_for(&self.scenes, frame.sequence()) else {
            return Ok(None);
        };
        if scene.fail {
            return Err(anyhow!("scripted classifier failure"));
        }
        Ok(scene
            .faces
            .iter()
            .find(|scripted| scripted.observation == *face)
            .and_then(|scripted| scripted.expression.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::geometry::{CaptureOrientation, NormalizedRect};

    fn frame(sequence: u64) -> Frame {
        Frame::new(vec![0u8; 3], 1, 1, sequence, CaptureOrientation::Portrait, false)
    }

    #[test]
    fn replays_by_sequence_and_repeats_last() {
        let face = FaceObservation::new(NormalizedRect::new(0.4, 0.4, 0.2, 0.2));
        let mut backend = ScriptedBackend::new(vec![
            Scene::empty(),
            Scene::empty().with_face(face.clone(), Some(RawExpression::new("happy", 0.9))),
        ]);
        let mut classifier = backend.classifier();

        let f0 = frame(0);
        assert!(backend.detect_faces(&f0.view()).unwrap().is_empty());

        let f5 = frame(5);
        let faces = backend.detect_faces(&f5.view()).unwrap();
        assert_eq!(faces.len(), 1);
        let label = classifier.classify(&f5.view(), &faces[0]).unwrap();
        assert_eq!(label, Some(RawExpression::new("happy", 0.9)));
    }

    #[test]
    fn failing_scene_errors() {
        let mut backend = ScriptedBackend::new(vec![Scene::failing()]);
        let f = frame(0);
        assert!(backend.detect_poses(&f.view()).is_err());
        assert!(backend.detect_faces(&f.view()).is_err());
    }
}
