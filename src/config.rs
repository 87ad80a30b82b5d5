use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::analyzer::EngineSettings;
use crate::director::{
    CompositionThresholds, LightingThresholds, LightingVariant, TargetLandmark,
    DEFAULT_ALIGNMENT_TOLERANCE,
};
use crate::geo::GeoCoordinate;
use crate::geometry::{CaptureOrientation, NormalizedPoint};
use crate::heading::DEFAULT_HEADING_ALPHA;

const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_CAMERA_FPS: u32 = 30;

#[derive(Debug, Deserialize, Default)]
struct DirectorConfigFile {
    engine: Option<EngineConfigFile>,
    composition: Option<CompositionConfigFile>,
    lighting: Option<LightingConfigFile>,
    heading: Option<HeadingConfigFile>,
    landmark: Option<LandmarkConfigFile>,
    classifier: Option<ClassifierConfigFile>,
    camera: Option<CameraConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct EngineConfigFile {
    frame_interval: Option<u32>,
    max_faces_to_classify: Option<usize>,
    expression_interval: Option<u32>,
    label_window: Option<usize>,
    max_tracked_faces: Option<usize>,
    min_expression_confidence: Option<f32>,
    min_pose_nose_confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct CompositionConfigFile {
    roll_threshold: Option<f64>,
    framing_tolerance: Option<f64>,
    target_point: Option<NormalizedPoint>,
}

#[derive(Debug, Deserialize, Default)]
struct LightingConfigFile {
    variant: Option<LightingVariant>,
    thresholds: Option<LightingThresholds>,
}

#[derive(Debug, Deserialize, Default)]
struct HeadingConfigFile {
    alpha: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LandmarkConfigFile {
    name: String,
    latitude: f64,
    longitude: f64,
    alignment_tolerance: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct ClassifierConfigFile {
    preferred: Option<String>,
    model_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
    orientation: Option<CaptureOrientation>,
    mirrored: Option<bool>,
}

/// Runtime configuration for a director session and its engine.
#[derive(Debug, Clone)]
pub struct DirectorConfig {
    pub engine: EngineSettings,
    pub composition: CompositionThresholds,
    /// Where the subject's nose should land, in preview space.
    pub target_point: NormalizedPoint,
    pub lighting_variant: LightingVariant,
    pub lighting: LightingThresholds,
    pub heading_alpha: f64,
    pub landmark: Option<TargetLandmark>,
    pub alignment_tolerance: f64,
    pub classifier: ClassifierSettings,
    pub camera: CameraSettings,
}

#[derive(Debug, Clone, Default)]
pub struct ClassifierSettings {
    /// Registry name to select; falls back when missing.
    pub preferred: Option<String>,
    /// ONNX model for the `tract` classifier.
    pub model_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub orientation: CaptureOrientation,
    pub mirrored: bool,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self::from_file(DirectorConfigFile::default())
    }
}

impl DirectorConfig {
    /// Defaults, then the JSON file named by `SHOT_DIRECTOR_CONFIG`, then
    /// `SHOT_DIRECTOR_*` overrides, then validation.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SHOT_DIRECTOR_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: DirectorConfigFile) -> Self {
        let defaults = EngineSettings::default();
        let engine_file = file.engine.unwrap_or_default();
        let engine = EngineSettings {
            frame_interval: engine_file.frame_interval.unwrap_or(defaults.frame_interval),
            max_faces_to_classify: engine_file
                .max_faces_to_classify
                .unwrap_or(defaults.max_faces_to_classify),
            expression_interval: engine_file
                .expression_interval
                .unwrap_or(defaults.expression_interval),
            label_window: engine_file.label_window.unwrap_or(defaults.label_window),
            max_tracked_faces: engine_file
                .max_tracked_faces
                .unwrap_or(defaults.max_tracked_faces),
            min_expression_confidence: engine_file
                .min_expression_confidence
                .unwrap_or(defaults.min_expression_confidence),
            min_pose_nose_confidence: engine_file
                .min_pose_nose_confidence
                .unwrap_or(defaults.min_pose_nose_confidence),
        };

        let composition_file = file.composition.unwrap_or_default();
        let thresholds = CompositionThresholds::default();
        let composition = CompositionThresholds {
            roll: composition_file.roll_threshold.unwrap_or(thresholds.roll),
            framing_tolerance: composition_file
                .framing_tolerance
                .unwrap_or(thresholds.framing_tolerance),
        };
        let target_point = composition_file
            .target_point
            .unwrap_or(NormalizedPoint::CENTER);

        let lighting_file = file.lighting.unwrap_or_default();
        let (landmark, alignment_tolerance) = match file.landmark {
            Some(landmark) => (
                Some(TargetLandmark::new(
                    landmark.name,
                    GeoCoordinate::new(landmark.latitude, landmark.longitude),
                )),
                landmark
                    .alignment_tolerance
                    .unwrap_or(DEFAULT_ALIGNMENT_TOLERANCE),
            ),
            None => (None, DEFAULT_ALIGNMENT_TOLERANCE),
        };

        let classifier_file = file.classifier.unwrap_or_default();
        let camera_file = file.camera.unwrap_or_default();

        Self {
            engine,
            composition,
            target_point,
            lighting_variant: lighting_file.variant.unwrap_or_default(),
            lighting: lighting_file.thresholds.unwrap_or_default(),
            heading_alpha: file
                .heading
                .and_then(|heading| heading.alpha)
                .unwrap_or(DEFAULT_HEADING_ALPHA),
            landmark,
            alignment_tolerance,
            classifier: ClassifierSettings {
                preferred: classifier_file.preferred,
                model_path: classifier_file.model_path,
            },
            camera: CameraSettings {
                width: camera_file.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
                height: camera_file.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
                fps: camera_file.fps.unwrap_or(DEFAULT_CAMERA_FPS),
                orientation: camera_file.orientation.unwrap_or_default(),
                mirrored: camera_file.mirrored.unwrap_or(false),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(interval) = std::env::var("SHOT_DIRECTOR_FRAME_INTERVAL") {
            self.engine.frame_interval = interval.trim().parse().map_err(|_| {
                anyhow!("SHOT_DIRECTOR_FRAME_INTERVAL must be a positive integer")
            })?;
        }
        if let Ok(variant) = std::env::var("SHOT_DIRECTOR_LIGHTING_VARIANT") {
            if !variant.trim().is_empty() {
                self.lighting_variant = variant.parse()?;
            }
        }
        if let Ok(alpha) = std::env::var("SHOT_DIRECTOR_HEADING_ALPHA") {
            self.heading_alpha = alpha
                .trim()
                .parse()
                .map_err(|_| anyhow!("SHOT_DIRECTOR_HEADING_ALPHA must be a number"))?;
        }
        if let Ok(landmark) = std::env::var("SHOT_DIRECTOR_LANDMARK") {
            if !landmark.trim().is_empty() {
                self.landmark = Some(parse_landmark(&landmark)?);
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let engine = &self.engine;
        if engine.frame_interval == 0 {
            bail!("engine.frame_interval must be at least 1");
        }
        if engine.expression_interval == 0 {
            bail!("engine.expression_interval must be at least 1");
        }
        if engine.max_faces_to_classify == 0 {
            bail!("engine.max_faces_to_classify must be at least 1");
        }
        if engine.max_tracked_faces < engine.max_faces_to_classify {
            bail!("engine.max_tracked_faces must be at least max_faces_to_classify");
        }
        for (name, value) in [
            ("engine.min_expression_confidence", engine.min_expression_confidence),
            ("engine.min_pose_nose_confidence", engine.min_pose_nose_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{} must be within [0, 1]", name);
            }
        }

        if !(self.composition.roll.is_finite() && self.composition.roll > 0.0) {
            bail!("composition.roll_threshold must be positive");
        }
        if !(self.composition.framing_tolerance.is_finite()
            && self.composition.framing_tolerance > 0.0)
        {
            bail!("composition.framing_tolerance must be positive");
        }
        let target = self.target_point;
        if !(target.is_finite() && (0.0..=1.0).contains(&target.x) && (0.0..=1.0).contains(&target.y)) {
            bail!("composition.target_point must lie within [0, 1]");
        }

        let lighting = &self.lighting;
        if !(0.0 < lighting.front_max
            && lighting.front_max <= lighting.side_max
            && lighting.side_max <= lighting.transition_max
            && lighting.transition_max <= 180.0)
        {
            bail!("lighting thresholds must satisfy 0 < front <= side <= transition <= 180");
        }
        if !(0.0..180.0).contains(&lighting.strict_sun_cone) {
            bail!("lighting.strict_sun_cone must be within [0, 180)");
        }
        if !(lighting.strict_max_elevation > 0.0 && lighting.strict_max_elevation <= 90.0) {
            bail!("lighting.strict_max_elevation must be within (0, 90]");
        }

        if !(self.heading_alpha.is_finite() && self.heading_alpha > 0.0 && self.heading_alpha <= 1.0) {
            bail!("heading.alpha must be within (0, 1]");
        }

        if let Some(landmark) = &self.landmark {
            if landmark.name.trim().is_empty() {
                bail!("landmark.name must not be empty");
            }
            if !landmark.coordinate.is_valid() {
                bail!("landmark coordinate out of range");
            }
        }
        if !(self.alignment_tolerance.is_finite()
            && self.alignment_tolerance > 0.0
            && self.alignment_tolerance < 180.0)
        {
            bail!("landmark.alignment_tolerance must be within (0, 180)");
        }

        if self.camera.width == 0 || self.camera.height == 0 || self.camera.fps == 0 {
            bail!("camera width, height and fps must be non-zero");
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<DirectorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

/// `name,latitude,longitude`; the name may itself contain commas.
fn parse_landmark(value: &str) -> Result<TargetLandmark> {
    let mut parts = value.rsplitn(3, ',').map(str::trim);
    let (Some(longitude), Some(latitude), Some(name)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("SHOT_DIRECTOR_LANDMARK must be 'name,latitude,longitude'");
    };
    let latitude: f64 = latitude
        .parse()
        .map_err(|_| anyhow!("SHOT_DIRECTOR_LANDMARK latitude must be a number"))?;
    let longitude: f64 = longitude
        .parse()
        .map_err(|_| anyhow!("SHOT_DIRECTOR_LANDMARK longitude must be a number"))?;
    Ok(TargetLandmark::new(name, GeoCoordinate::new(latitude, longitude)))
}
