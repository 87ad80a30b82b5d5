use anyhow::Result;

use crate::detect::result::{FaceObservation, PoseObservation};
use crate::expression::RawExpression;
use crate::frame::FrameView;

/// Pose and face detection for one frame.
///
/// # Frame boundary
///
/// Implementations receive a `FrameView` borrow and MUST NOT keep pixels past the
/// call. Returned observations are in detector space (normalized, bottom-left origin);
/// the analyzer converts them to preview space.
pub trait VisionBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Body poses present in the frame.
    fn detect_poses(&mut self, frame: &FrameView<'_>) -> Result<Vec<PoseObservation>>;

    /// Faces present in the frame, with landmarks when available.
    fn detect_faces(&mut self, frame: &FrameView<'_>) -> Result<Vec<FaceObservation>>;

    /// Optional warm-up hook, run once before the worker starts.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

/// What a classifier needs from the detector to produce a label.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassifierInput {
    /// Pixels inside the face box.
    FacePixels,
    /// Face landmarks only; no model required.
    Landmarks,
}

/// Expression classifier restricted to one face's region of interest.
pub trait ExpressionClassifier: Send {
    fn name(&self) -> &'static str;

    fn supports(&self, input: ClassifierInput) -> bool;

    /// Top label and confidence for `face`, or `None` when the classifier has no
    /// opinion (for example, landmarks missing).
    fn classify(
        &mut self,
        frame: &FrameView<'_>,
        face: &FaceObservation,
    ) -> Result<Option<RawExpression>>;
}
