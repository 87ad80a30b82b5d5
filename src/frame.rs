//! Camera frame container.
//!
//! - `Frame`: owned pixel buffer handed over by the capture subsystem. Bytes are private.
//! - `FrameView`: borrowed view detectors receive for the duration of one pass.
//!
//! The inference engine takes ownership of a submitted frame and drops it as soon as
//! the pass finishes. Nothing in the crate stores a frame or a view past that point,
//! and pixel memory is zeroed on drop.

use std::time::{Duration, Instant};
use zeroize::Zeroize;

use crate::geometry::CaptureOrientation;

/// Opaque camera frame (packed RGB24).
///
/// There is no `Clone` and no byte accessor on the frame itself; detectors read pixels
/// through a `FrameView`.
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Monotonic sequence number assigned by the capture source.
    pub sequence: u64,
    /// Relationship between the sensor buffer and the preview.
    pub orientation: CaptureOrientation,
    /// True for front-facing capture shown mirrored.
    pub is_mirrored: bool,
    captured_at: Instant,
}

impl Frame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        sequence: u64,
        orientation: CaptureOrientation,
        is_mirrored: bool,
    ) -> Self {
        Self {
            data,
            width,
            height,
            sequence,
            orientation,
            is_mirrored,
            captured_at: Instant::now(),
        }
    }

    /// Restricted view handed to detectors.
    pub fn view(&self) -> FrameView<'_> {
        FrameView { frame: self }
    }

    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print pixel content.
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("orientation", &self.orientation)
            .field("is_mirrored", &self.is_mirrored)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

/// Borrowed view of a frame for one inference pass.
#[derive(Clone, Copy)]
pub struct FrameView<'a> {
    frame: &'a Frame,
}

impl<'a> FrameView<'a> {
    pub fn width(&self) -> u32 {
        self.frame.width
    }

    pub fn height(&self) -> u32 {
        self.frame.height
    }

    pub fn sequence(&self) -> u64 {
        self.frame.sequence
    }

    pub fn orientation(&self) -> CaptureOrientation {
        self.frame.orientation
    }

    pub fn is_mirrored(&self) -> bool {
        self.frame.is_mirrored
    }

    /// Pixel bytes, valid only while the view is.
    pub fn pixels(&self) -> &'a [u8] {
        &self.frame.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_exposes_metadata() {
        let frame = Frame::new(vec![7u8; 12], 2, 2, 42, CaptureOrientation::Portrait, true);
        let view = frame.view();
        assert_eq!(view.width(), 2);
        assert_eq!(view.height(), 2);
        assert_eq!(view.sequence(), 42);
        assert_eq!(view.orientation(), CaptureOrientation::Portrait);
        assert!(view.is_mirrored());
        assert_eq!(view.pixels().len(), 12);
    }

    #[test]
    fn debug_output_omits_pixels() {
        let frame = Frame::new(vec![255u8; 3], 1, 1, 0, CaptureOrientation::LandscapeLeft, false);
        let rendered = format!("{frame:?}");
        assert!(rendered.contains("bytes: 3"));
        assert!(!rendered.contains("255"));
    }
}
