#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::{ClassifierInput, ExpressionClassifier};
use crate::detect::result::FaceObservation;
use crate::expression::RawExpression;
use crate::frame::FrameView;

/// Side length of the grayscale face crop the model expects.
const INPUT_SIZE: usize = 64;

/// Output order of FER+ style emotion models.
const LABELS: [&str; 8] = [
    "neutral",
    "happiness",
    "surprise",
    "sadness",
    "anger",
    "disgust",
    "fear",
    "contempt",
];

/// Tract-based emotion classifier for ONNX models.
///
/// Loads a local model file and runs it on the face region of interest of an RGB24
/// frame. No network I/O; nothing is written to disk.
pub struct TractExpressionClassifier {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
}

impl TractExpressionClassifier {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 1, INPUT_SIZE, INPUT_SIZE)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model })
    }

    fn build_input(&self, frame: &FrameView<'_>, face: &FaceObservation) -> Result<Tensor> {
        let width = frame.width() as usize;
        let height = frame.height() as usize;
        let pixels = frame.pixels();
        let expected_len = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        // Face bounds are bottom-left origin; pixel rows run top-down.
        let bounds = face.bounds;
        let left = (bounds.x.clamp(0.0, 1.0) * width as f64) as usize;
        let right = ((bounds.x + bounds.width).clamp(0.0, 1.0) * width as f64) as usize;
        let top = ((1.0 - bounds.max_y()).clamp(0.0, 1.0) * height as f64) as usize;
        let bottom = ((1.0 - bounds.y).clamp(0.0, 1.0) * height as f64) as usize;
        if right <= left || bottom <= top {
            return Err(anyhow!("face region of interest is empty"));
        }
        let roi_w = right - left;
        let roi_h = bottom - top;

        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 1, INPUT_SIZE, INPUT_SIZE),
            |(_, _, y, x)| {
                let src_x = (left + x * roi_w / INPUT_SIZE).min(width - 1);
                let src_y = (top + y * roi_h / INPUT_SIZE).min(height - 1);
                let idx = (src_y * width + src_x) * 3;
                0.299 * pixels[idx] as f32
                    + 0.587 * pixels[idx + 1] as f32
                    + 0.114 * pixels[idx + 2] as f32
            },
        );

        Ok(input.into_tensor())
    }

    fn top_label(&self, outputs: TVec<TValue>) -> Result<RawExpression> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let scores: Vec<f32> = scores.iter().copied().collect();
        if scores.len() < LABELS.len() {
            return Err(anyhow!(
                "model produced {} scores, expected {}",
                scores.len(),
                LABELS.len()
            ));
        }

        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exp: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
        let sum: f32 = exp.iter().sum();
        let (best, best_exp) = exp
            .iter()
            .copied()
            .enumerate()
            .take(LABELS.len())
            .fold((0, f32::NEG_INFINITY), |acc, (i, v)| if v > acc.1 { (i, v) } else { acc });

        let confidence = if sum.is_finite() && sum > 0.0 {
            best_exp / sum
        } else {
            0.0
        };
        Ok(RawExpression::new(LABELS[best], confidence))
    }
}

impl ExpressionClassifier for TractExpressionClassifier {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn supports(&self, input: ClassifierInput) -> bool {
        matches!(input, ClassifierInput::FacePixels)
    }

    fn classify(
        &mut self,
        frame: &FrameView<'_>,
        face: &FaceObservation,
    ) -> Result<Option<RawExpression>> {
        let input = self.build_input(frame, face)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        Ok(Some(self.top_label(outputs)?))
    }
}
