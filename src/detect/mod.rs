//! Detector seams.
//!
//! - `VisionBackend`: body-pose and face/landmark detection.
//! - `ExpressionClassifier`: per-face expression labels.
//! - `ClassifierRegistry`: named classifiers with a landmark-only fallback.

mod backend;
pub mod backends;
mod registry;
mod result;

pub use backend::{ClassifierInput, ExpressionClassifier, VisionBackend};
pub use backends::{MouthGeometryClassifier, Scene, ScriptedBackend, ScriptedClassifier, ScriptedFace};
pub use registry::{ClassifierRegistry, SharedClassifier};
pub use result::{
    DetectionResult, FaceLandmarks, FaceObservation, Keypoint, PoseObservation,
};
