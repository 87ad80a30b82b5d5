//! Facial expression vocabulary and confidence gating.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classifier output below this confidence is reported as `Neutral`.
pub const MIN_EXPRESSION_CONFIDENCE: f32 = 0.60;

/// Fixed expression vocabulary reported to consumers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expression {
    Happy,
    Surprised,
    Angry,
    Sad,
    #[default]
    Neutral,
    Fear,
    Disgust,
}

impl Expression {
    /// Map a raw classifier label onto the vocabulary. Unknown labels are `Neutral`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "happy" | "happiness" | "joy" | "smile" => Expression::Happy,
            "surprise" | "surprised" => Expression::Surprised,
            "anger" | "angry" => Expression::Angry,
            "sad" | "sadness" => Expression::Sad,
            "fear" | "fearful" | "scared" => Expression::Fear,
            "disgust" | "disgusted" | "contempt" => Expression::Disgust,
            _ => Expression::Neutral,
        }
    }

    /// Expressions worth coaching the subject out of.
    pub fn wants_coaching(self) -> bool {
        matches!(
            self,
            Expression::Neutral | Expression::Sad | Expression::Angry
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Expression::Happy => "Happy",
            Expression::Surprised => "Surprised",
            Expression::Angry => "Angry",
            Expression::Sad => "Sad",
            Expression::Neutral => "Neutral",
            Expression::Fear => "Fear",
            Expression::Disgust => "Disgust",
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top label and confidence as produced by a classifier, before gating.
#[derive(Clone, Debug, PartialEq)]
pub struct RawExpression {
    pub label: String,
    pub confidence: f32,
}

impl RawExpression {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Gate on confidence, then map to the vocabulary.
    pub fn normalize(&self, min_confidence: f32) -> Expression {
        if !self.confidence.is_finite() || self.confidence < min_confidence {
            return Expression::Neutral;
        }
        Expression::from_label(&self.label)
    }
}
