use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};

use shot_director::config::DirectorConfig;
use shot_director::detect::{FaceObservation, Scene, ScriptedBackend, SharedClassifier};
use shot_director::{
    CaptureOrientation, DirectorSession, EngineSettings, Expression, Frame, FrameAnalyzer,
    GeoCoordinate, LightingKind, NormalizedRect, RawExpression, SubmitOutcome, VisionEngine,
};

/// Face whose box heuristic lands the nose on the preview center.
fn centered_face() -> FaceObservation {
    FaceObservation::new(NormalizedRect::new(0.4, 0.42, 0.2, 0.2)).with_track_id(11)
}

/// Frames 1-4 empty; frames 5-10 show the centered face, happy five times and
/// neutral once.
fn ten_frame_script() -> Vec<Scene> {
    let labels = ["happy", "happy", "neutral", "happy", "happy", "happy"];
    let mut scenes = vec![Scene::empty(); 4];
    scenes.extend(labels.iter().map(|label| {
        Scene::empty().with_face(centered_face(), Some(RawExpression::new(*label, 0.9)))
    }));
    scenes
}

fn frame(sequence: u64) -> Frame {
    Frame::new(
        vec![0u8; 4 * 4 * 3],
        4,
        4,
        sequence,
        CaptureOrientation::LandscapeLeft,
        false,
    )
}

fn settings() -> EngineSettings {
    EngineSettings {
        frame_interval: 1,
        ..EngineSettings::default()
    }
}

fn scripted(backend: &ScriptedBackend) -> SharedClassifier {
    Arc::new(Mutex::new(backend.classifier()))
}

fn wait_idle(engine: &VisionEngine) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while engine.is_busy() {
        assert!(Instant::now() < deadline, "engine never went idle");
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn ten_frames_through_the_engine_end_happy_and_framed() {
    let backend = ScriptedBackend::new(ten_frame_script());
    let classifier = scripted(&backend);
    let engine = VisionEngine::spawn(settings(), Box::new(backend), Some(classifier))
        .expect("spawn engine");
    let watcher = engine.subscribe();
    let mut session = DirectorSession::new(DirectorConfig::default());

    for sequence in 0..10 {
        assert_eq!(engine.submit_frame(frame(sequence)), SubmitOutcome::Accepted);
        wait_idle(&engine);
        session.on_detection(watcher.latest());
        if sequence < 4 {
            assert_eq!(session.composition().text, "Find your Subject");
        }
    }

    let result = watcher.latest();
    assert_eq!(result.people_count(), 1);
    assert_eq!(result.primary_expression(), Some(Expression::Happy));
    assert_eq!(session.composition().text, "Perfect! Shoot!");

    let stats = engine.stats();
    assert_eq!(stats.processed, 10);
    assert_eq!(stats.dropped_busy, 0);
    engine.stop().expect("stop engine");
}

#[test]
fn ten_frames_through_the_analyzer() {
    let backend = ScriptedBackend::new(ten_frame_script());
    let classifier = scripted(&backend);
    let mut analyzer = FrameAnalyzer::new(Box::new(backend), Some(classifier), settings());

    let results: Vec<_> = (0..10)
        .map(|sequence| analyzer.analyze(&frame(sequence).view()))
        .collect();

    assert!(results[..4].iter().all(|r| !r.is_person_detected()));
    // The single neutral label never outvotes the happy majority.
    for result in &results[4..] {
        assert_eq!(result.expressions(), &[Expression::Happy]);
        let nose = result.nose_point().expect("nose point");
        assert!((nose.x - 0.5).abs() < 1e-9 && (nose.y - 0.5).abs() < 1e-9);
    }
}

#[test]
fn neutral_majority_asks_for_a_laugh() {
    let labels = ["neutral", "happy", "neutral"];
    let scenes: Vec<Scene> = labels
        .iter()
        .map(|label| Scene::empty().with_face(centered_face(), Some(RawExpression::new(*label, 0.9))))
        .collect();
    let backend = ScriptedBackend::new(scenes);
    let classifier = scripted(&backend);
    let mut analyzer = FrameAnalyzer::new(Box::new(backend), Some(classifier), settings());
    let mut session = DirectorSession::new(DirectorConfig::default());
    for sequence in 0..3 {
        session.on_detection(analyzer.analyze(&frame(sequence).view()));
    }
    assert_eq!(session.composition().text, "Make her laugh!");
}

#[test]
fn bystander_label_never_coaches_the_unlabeled_subject() {
    let bystander = FaceObservation::new(NormalizedRect::new(0.05, 0.05, 0.05, 0.05)).with_track_id(12);
    let scene = Scene::empty()
        .with_face(centered_face(), None)
        .with_face(bystander, Some(RawExpression::new("sad", 0.9)));
    let backend = ScriptedBackend::new(vec![scene]);
    let classifier = scripted(&backend);
    let mut analyzer = FrameAnalyzer::new(Box::new(backend), Some(classifier), settings());

    let result = analyzer.analyze(&frame(0).view());
    assert_eq!(result.people_count(), 2);
    assert!(result.expressions().is_empty());
    assert_eq!(result.primary_expression(), None);

    let mut session = DirectorSession::new(DirectorConfig::default());
    session.on_detection(result);
    assert_eq!(session.composition().text, "Perfect! Shoot!");
}

#[test]
fn throttled_engine_only_sees_every_third_frame() {
    let backend = ScriptedBackend::new(ten_frame_script());
    let classifier = scripted(&backend);
    let engine = VisionEngine::spawn(EngineSettings::default(), Box::new(backend), Some(classifier))
        .expect("spawn engine");

    let mut accepted = Vec::new();
    for sequence in 0..10 {
        if engine.submit_frame(frame(sequence)) == SubmitOutcome::Accepted {
            accepted.push(sequence);
        }
        wait_idle(&engine);
    }
    assert_eq!(accepted, vec![0, 3, 6, 9]);
    let stats = engine.stats();
    assert_eq!(stats.skipped, 6);
    assert_eq!(stats.processed, 4);
    assert_eq!(
        engine.subscribe().latest().primary_expression(),
        Some(Expression::Happy)
    );
}

#[test]
fn compass_stream_settles_lighting() {
    let mut session = DirectorSession::new(DirectorConfig::default());
    let noon = Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap();
    assert!(session.on_location(GeoCoordinate::new(0.0, 0.0)));
    assert_eq!(session.lighting(noon).kind, LightingKind::Calibrating);

    for reading in [358.0, 2.0, 359.0, 1.0, 0.0, 357.0, 3.0] {
        session.on_heading(reading);
    }
    let heading = session.heading().expect("heading");
    assert!(heading < 5.0 || heading > 355.0, "heading {}", heading);

    let advice = session.lighting(noon);
    assert_ne!(advice.kind, LightingKind::Calibrating);
    assert!(advice.relative_bearing.is_some());
}
