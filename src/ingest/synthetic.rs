use anyhow::{bail, Result};
use rand::Rng;

use crate::config::CameraSettings;
use crate::frame::Frame;
use crate::geo::normalize_degrees;
use crate::geometry::CaptureOrientation;

/// Camera stand-in producing RGB24 frames with sequence numbers starting at 0.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    orientation: CaptureOrientation,
    mirrored: bool,
    next_sequence: u64,
    /// Shifts every 50 frames to give the pattern some movement.
    scene_state: u8,
}

impl SyntheticCamera {
    pub fn new(settings: &CameraSettings) -> Result<Self> {
        if settings.width == 0 || settings.height == 0 {
            bail!(
                "synthetic camera needs a non-empty frame, got {}x{}",
                settings.width,
                settings.height
            );
        }
        log::info!(
            "synthetic camera: {}x{} {:?}{}",
            settings.width,
            settings.height,
            settings.orientation,
            if settings.mirrored { " (mirrored)" } else { "" }
        );
        Ok(Self {
            width: settings.width,
            height: settings.height,
            orientation: settings.orientation,
            mirrored: settings.mirrored,
            next_sequence: 0,
            scene_state: 0,
        })
    }

    pub fn frames_captured(&self) -> u64 {
        self.next_sequence
    }

    pub fn next_frame(&mut self) -> Frame {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        if sequence > 0 && sequence % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let pixels = self.generate_pixels(sequence);
        Frame::new(
            pixels,
            self.width,
            self.height,
            sequence,
            self.orientation,
            self.mirrored,
        )
    }

    fn generate_pixels(&self, sequence: u64) -> Vec<u8> {
        let len = self.width as usize * self.height as usize * 3;
        let mut rng = rand::thread_rng();
        let mut pixels = vec![0u8; len];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            let base = (i as u64 + sequence + u64::from(self.scene_state)) % 256;
            // Sensor noise.
            *pixel = (base as u8).wrapping_add(rng.gen_range(0..4));
        }
        pixels
    }
}

/// Magnetometer stand-in: a fixed true heading plus uniform jitter.
pub struct SyntheticCompass {
    true_heading: f64,
    jitter: f64,
}

impl SyntheticCompass {
    pub fn new(true_heading: f64, jitter: f64) -> Self {
        Self {
            true_heading: normalize_degrees(true_heading),
            jitter: jitter.abs(),
        }
    }

    /// Turn the device by `degrees` (positive clockwise).
    pub fn rotate(&mut self, degrees: f64) {
        self.true_heading = normalize_degrees(self.true_heading + degrees);
    }

    pub fn true_heading(&self) -> f64 {
        self.true_heading
    }

    pub fn next_reading(&self) -> f64 {
        if self.jitter == 0.0 {
            return self.true_heading;
        }
        let noise = rand::thread_rng().gen_range(-self.jitter..=self.jitter);
        normalize_degrees(self.true_heading + noise)
    }
}
