//! director_demo - synthetic capture session through the engine and all directors
//!
//! Drives a scripted subject walking into frame, a jittery compass and a device that
//! starts out tilted, and logs every guidance change.

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shot_director::config::DirectorConfig;
use shot_director::detect::{
    ClassifierRegistry, FaceObservation, MouthGeometryClassifier, Scene, ScriptedBackend,
};
use shot_director::ingest::{SyntheticCamera, SyntheticCompass};
use shot_director::{
    DeviceAttitude, DirectorSession, GeoCoordinate, LightingVariant, NormalizedRect,
    RawExpression, VisionEngine,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Duration of the synthetic session in seconds.
    #[arg(long, default_value_t = 5)]
    seconds: u64,
    /// Camera frame rate (overrides config).
    #[arg(long)]
    fps: Option<u32>,
    /// True compass heading of the device in degrees.
    #[arg(long, default_value_t = 200.0)]
    heading: f64,
    /// Compass jitter amplitude in degrees.
    #[arg(long, default_value_t = 4.0)]
    jitter: f64,
    #[arg(long, default_value_t = 48.8566, allow_hyphen_values = true)]
    latitude: f64,
    #[arg(long, default_value_t = 2.3522, allow_hyphen_values = true)]
    longitude: f64,
    /// Expression classifier name (scripted, mouth-geometry, tract).
    #[arg(long)]
    classifier: Option<String>,
    /// Lighting rules: evaluate or strict.
    #[arg(long)]
    lighting: Option<String>,
    /// ONNX emotion model (requires the backend-tract feature).
    #[arg(long)]
    model: Option<std::path::PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = DirectorConfig::load()?;
    if let Some(fps) = args.fps {
        if fps == 0 {
            return Err(anyhow!("fps must be >= 1"));
        }
        config.camera.fps = fps;
    }
    if let Some(variant) = args.lighting.as_deref() {
        config.lighting_variant = variant.parse::<LightingVariant>()?;
    }
    if args.classifier.is_some() {
        config.classifier.preferred = args.classifier.clone();
    }
    if args.model.is_some() {
        config.classifier.model_path = args.model.clone();
    }

    let total_frames = args.seconds.saturating_mul(u64::from(config.camera.fps));
    let backend = ScriptedBackend::new(script(total_frames));

    let mut registry = ClassifierRegistry::new();
    registry.register(backend.classifier());
    registry.register(MouthGeometryClassifier::new());
    register_model(&mut registry, &config)?;
    log::info!("expression classifiers: {}", registry.list().join(", "));
    let classifier = registry.select(config.classifier.preferred.as_deref())?;

    let engine = VisionEngine::spawn(config.engine.clone(), Box::new(backend), classifier)?;
    let watcher = engine.subscribe();

    let running = Arc::new(AtomicBool::new(true));
    let running_handler = running.clone();
    ctrlc::set_handler(move || {
        running_handler.store(false, Ordering::SeqCst);
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    let mut camera = SyntheticCamera::new(&config.camera)?;
    let mut compass = SyntheticCompass::new(args.heading, args.jitter);
    let mut session = DirectorSession::new(config.clone());
    if !session.on_location(GeoCoordinate::new(args.latitude, args.longitude)) {
        return Err(anyhow!(
            "invalid location {}, {}",
            args.latitude,
            args.longitude
        ));
    }

    let fps = u64::from(config.camera.fps);
    let frame_period = Duration::from_millis(1000 / fps.max(1));
    let mut seen_version = 0;
    let mut last_instruction = String::new();

    for index in 0..total_frames {
        if !running.load(Ordering::SeqCst) {
            log::info!("interrupted");
            break;
        }

        engine.submit_frame(camera.next_frame());

        session.on_heading(compass.next_reading());
        // Level the device after the first second.
        session.on_attitude(DeviceAttitude {
            roll: if index < fps { 0.12 } else { 0.0 },
            is_level: index >= fps,
        });

        let version = watcher.version();
        if version != seen_version {
            seen_version = version;
            session.on_detection(watcher.latest());
        }

        let instruction = session.composition();
        if instruction.text != last_instruction {
            log::info!(
                "frame {:>4}: {} [{:?}/{:?}]",
                index,
                instruction.text,
                instruction.priority,
                instruction.severity
            );
            last_instruction = instruction.text;
        }

        if index % fps == 0 {
            let now = Utc::now();
            let lighting = session.lighting(now);
            log::info!(
                "lighting: {} (score {}){}",
                lighting.title,
                lighting.score,
                lighting
                    .turn_hint()
                    .map(|hint| format!(", {}", hint))
                    .unwrap_or_default()
            );
            if let Some(advice) = session.landmark(now) {
                log::info!(
                    "landmark: {} ({:.0} m)",
                    advice.instruction.text,
                    advice.distance_m
                );
            }
            // Pan the device a little each second.
            compass.rotate(15.0);
        }

        std::thread::sleep(frame_period);
    }

    let stats = engine.stats();
    engine.stop()?;
    log::info!(
        "frames={} skipped={} dropped_busy={} processed={} published={}",
        stats.received,
        stats.skipped,
        stats.dropped_busy,
        stats.processed,
        stats.published
    );
    if let Some(expression) = session.detection().primary_expression() {
        log::info!("final expression: {}", expression);
    }
    log::info!("final instruction: {}", last_instruction);
    Ok(())
}

/// A subject walks in after 20% of the run, drifts to the center and warms up.
fn script(total_frames: u64) -> Vec<Scene> {
    let total = total_frames.max(1);
    let enter = total / 5;
    (0..total)
        .map(|sequence| {
            if sequence < enter {
                return Scene::empty();
            }
            let progress = (sequence - enter) as f64 / (total - enter).max(1) as f64;
            let offset = (0.3 * (1.0 - 2.0 * progress)).max(0.0);
            // Once offset reaches 0 the box heuristic puts the nose on the frame center.
            let bounds = NormalizedRect::new(0.4 + offset, 0.42, 0.2, 0.2);
            let label = if progress < 0.5 { "neutral" } else { "happiness" };
            Scene::empty().with_face(
                FaceObservation::new(bounds).with_track_id(1),
                Some(RawExpression::new(label, 0.85)),
            )
        })
        .collect()
}

#[cfg(feature = "backend-tract")]
fn register_model(registry: &mut ClassifierRegistry, config: &DirectorConfig) -> Result<()> {
    use anyhow::Context;
    use shot_director::detect::backends::tract::TractExpressionClassifier;

    if let Some(path) = &config.classifier.model_path {
        let classifier = TractExpressionClassifier::new(path)
            .with_context(|| format!("failed to load expression model {}", path.display()))?;
        registry.register(classifier);
    }
    Ok(())
}

#[cfg(not(feature = "backend-tract"))]
fn register_model(_registry: &mut ClassifierRegistry, config: &DirectorConfig) -> Result<()> {
    if let Some(path) = &config.classifier.model_path {
        log::warn!(
            "ignoring model {}: built without the backend-tract feature",
            path.display()
        );
    }
    Ok(())
}
