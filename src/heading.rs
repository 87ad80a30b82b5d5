//! Compass heading low-pass filter.

use crate::geo::{normalize_degrees, relative_bearing};

/// Default blend weight for new samples.
pub const DEFAULT_HEADING_ALPHA: f64 = 0.25;

/// Exponential smoother over compass headings.
///
/// Blends along the shortest arc, so readings either side of north average to north
/// instead of south. The first sample seeds the filter. Non-finite samples are ignored.
#[derive(Clone, Debug)]
pub struct HeadingSmoother {
    alpha: f64,
    smoothed: Option<f64>,
}

impl HeadingSmoother {
    /// `alpha` is clamped into `(0, 1]`; non-finite values fall back to the default.
    pub fn new(alpha: f64) -> Self {
        let alpha = if alpha.is_finite() && alpha > 0.0 {
            alpha.min(1.0)
        } else {
            DEFAULT_HEADING_ALPHA
        };
        Self {
            alpha,
            smoothed: None,
        }
    }

    /// Feed a raw bearing and return the smoothed heading in `[0, 360)`.
    pub fn update(&mut self, raw_degrees: f64) -> Option<f64> {
        if !raw_degrees.is_finite() {
            log::debug!("heading sample rejected: {}", raw_degrees);
            return self.smoothed;
        }
        let raw = normalize_degrees(raw_degrees);
        let next = match self.smoothed {
            None => raw,
            Some(current) => normalize_degrees(current + self.alpha * relative_bearing(raw, current)),
        };
        self.smoothed = Some(next);
        self.smoothed
    }

    pub fn current(&self) -> Option<f64> {
        self.smoothed
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn reset(&mut self) {
        self.smoothed = None;
    }
}

impl Default for HeadingSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_HEADING_ALPHA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angular_error(a: f64, b: f64) -> f64 {
        relative_bearing(a, b).abs()
    }

    #[test]
    fn first_sample_seeds_filter() {
        let mut smoother = HeadingSmoother::default();
        assert_eq!(smoother.current(), None);
        assert_eq!(smoother.update(123.0), Some(123.0));
    }

    #[test]
    fn converges_to_constant_heading() {
        let mut smoother = HeadingSmoother::default();
        smoother.update(0.0);
        let mut samples = 0;
        while angular_error(smoother.current().unwrap(), 90.0) > 0.5 {
            smoother.update(90.0);
            samples += 1;
            assert!(samples <= 30, "did not converge");
        }
    }

    #[test]
    fn blends_through_north() {
        let mut smoother = HeadingSmoother::default();
        smoother.update(359.0);
        let h = smoother.update(1.0).unwrap();
        assert!(angular_error(h, 0.0) < 1.0, "heading {h}");
        assert!(angular_error(h, 180.0) > 170.0);
    }

    #[test]
    fn periodic_noise_does_not_drift() {
        let mut smoother = HeadingSmoother::default();
        smoother.update(0.0);
        for i in 0..200 {
            let raw = if i % 2 == 0 { 10.0 } else { 350.0 };
            let h = smoother.update(raw).unwrap();
            assert!(angular_error(h, 0.0) <= 10.0, "heading {h} at sample {i}");
        }
    }

    #[test]
    fn ignores_non_finite_samples() {
        let mut smoother = HeadingSmoother::default();
        smoother.update(45.0);
        assert_eq!(smoother.update(f64::NAN), Some(45.0));
        assert_eq!(smoother.update(f64::INFINITY), Some(45.0));
    }

    #[test]
    fn reset_forgets_state() {
        let mut smoother = HeadingSmoother::new(0.5);
        smoother.update(10.0);
        smoother.reset();
        assert_eq!(smoother.update(200.0), Some(200.0));
    }
}
