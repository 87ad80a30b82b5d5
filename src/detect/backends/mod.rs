pub mod mouth;
pub mod scripted;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use mouth::MouthGeometryClassifier;
pub use scripted::{Scene, ScriptedBackend, ScriptedClassifier, ScriptedFace};

#[cfg(feature = "backend-tract")]
pub use tract::TractExpressionClassifier;
