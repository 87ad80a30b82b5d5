//! Rule-based guidance.
//!
//! Each director is a pure function over the latest sensor state and returns exactly
//! one recommendation. Evaluation order inside a director decides which rule fires;
//! `Priority` and `Severity` only describe the result for display.

pub mod composition;
pub mod landmark;
pub mod lighting;

use serde::Serialize;

pub use composition::{direct_composition, CompositionInputs, CompositionThresholds};
pub use landmark::{guide_to_landmark, LandmarkAdvice, TargetLandmark, DEFAULT_ALIGNMENT_TOLERANCE};
pub use lighting::{
    evaluate_lighting, LightingAdvice, LightingKind, LightingThresholds, LightingVariant,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// Display colour for an instruction or advice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Gray,
}

impl Severity {
    /// Traffic-light colour for a 0-100 lighting score.
    pub fn for_score(score: u8) -> Self {
        match score {
            0..=39 => Severity::Red,
            40..=69 => Severity::Yellow,
            _ => Severity::Green,
        }
    }
}

/// One recommendation for the photographer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DirectorInstruction {
    pub text: String,
    /// Symbol name for the overlay.
    pub icon: &'static str,
    pub severity: Severity,
    pub priority: Priority,
}

impl DirectorInstruction {
    pub fn new(
        text: impl Into<String>,
        icon: &'static str,
        severity: Severity,
        priority: Priority,
    ) -> Self {
        Self {
            text: text.into(),
            icon,
            severity,
            priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bands() {
        assert_eq!(Severity::for_score(0), Severity::Red);
        assert_eq!(Severity::for_score(39), Severity::Red);
        assert_eq!(Severity::for_score(40), Severity::Yellow);
        assert_eq!(Severity::for_score(69), Severity::Yellow);
        assert_eq!(Severity::for_score(70), Severity::Green);
        assert_eq!(Severity::for_score(100), Severity::Green);
    }

    #[test]
    fn priorities_are_ordered() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::High < Priority::Critical);
    }
}
