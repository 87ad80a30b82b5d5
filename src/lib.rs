//! Shot director
//!
//! Real-time photo guidance from camera frames, device attitude, location and compass
//! heading. Frames flow through a single-flight vision engine; its latest result, the
//! smoothed heading and the sun's position feed rule-based directors that each return
//! one recommendation.
//!
//! # Module Structure
//!
//! - `frame`: Camera frames (Frame, FrameView); pixels are private and zeroed on drop
//! - `geometry`: Normalized points and boxes, detector-to-preview mapping
//! - `detect`: Detector seams, scripted and model-free backends, classifier registry
//! - `analyzer` / `engine`: Per-frame pipeline and the non-blocking worker around it
//! - `label_buffer`: Rolling majority vote per tracked face
//! - `heading`, `geo`, `solar`: Compass filtering, geodesy, sun position
//! - `director`: Composition, lighting and landmark guidance
//! - `session`: Consumer-facing state holder tying the streams together
//! - `config`: JSON file plus environment configuration
//! - `ingest`: Synthetic camera and compass

pub mod analyzer;
pub mod config;
pub mod detect;
pub mod director;
pub mod engine;
pub mod expression;
pub mod frame;
pub mod geo;
pub mod geometry;
pub mod heading;
pub mod ingest;
pub mod label_buffer;
pub mod session;
pub mod solar;

pub use analyzer::{EngineSettings, FaceKey, FrameAnalyzer};
pub use config::DirectorConfig;
pub use detect::{DetectionResult, ExpressionClassifier, VisionBackend};
pub use director::{
    CompositionInputs, CompositionThresholds, DirectorInstruction, LandmarkAdvice,
    LightingAdvice, LightingKind, LightingThresholds, LightingVariant, Priority, Severity,
    TargetLandmark,
};
pub use engine::{EngineStatsSnapshot, ResultWatcher, SubmitOutcome, VisionEngine};
pub use expression::{Expression, RawExpression};
pub use frame::{Frame, FrameView};
pub use geo::{relative_bearing, GeoCoordinate};
pub use geometry::{to_preview_space, CaptureOrientation, NormalizedPoint, NormalizedRect};
pub use heading::HeadingSmoother;
pub use label_buffer::{LabelBufferMap, RollingLabelBuffer};
pub use session::{DeviceAttitude, DirectorSession};
pub use solar::{sun_position, SunPosition};
