use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use super::backend::{ClassifierInput, ExpressionClassifier};

/// Shared handle to a registered classifier.
pub type SharedClassifier = Arc<Mutex<dyn ExpressionClassifier>>;

/// Thread-safe registry of expression classifiers.
///
/// Classifiers are wrapped in `Mutex` because `ExpressionClassifier::classify` takes
/// `&mut self`.
pub struct ClassifierRegistry {
    classifiers: HashMap<String, SharedClassifier>,
    default_name: Option<String>,
}

impl ClassifierRegistry {
    pub fn new() -> Self {
        Self {
            classifiers: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a classifier. The first registered classifier becomes the default.
    pub fn register<C: ExpressionClassifier + 'static>(&mut self, classifier: C) {
        let name = classifier.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.classifiers
            .insert(name, Arc::new(Mutex::new(classifier)));
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classifiers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Pick the classifier to run.
    ///
    /// Without a preference this is the default. A preferred name that is not
    /// registered falls back to a classifier that works from landmarks alone, then to
    /// the default. `None` means expression classification is unavailable and results
    /// carry no expressions.
    pub fn select(&self, preferred: Option<&str>) -> Result<Option<SharedClassifier>> {
        let Some(name) = preferred else {
            return Ok(self.default_classifier());
        };
        if let Some(classifier) = self.classifiers.get(name) {
            return Ok(Some(classifier.clone()));
        }
        log::warn!(
            "expression classifier '{}' not registered; falling back",
            name
        );

        let mut names: Vec<&String> = self.classifiers.keys().collect();
        names.sort();
        for name in names {
            let classifier = &self.classifiers[name];
            let supports = {
                let guard = classifier
                    .lock()
                    .map_err(|_| anyhow!("classifier lock poisoned"))?;
                guard.supports(ClassifierInput::Landmarks)
            };
            if supports {
                return Ok(Some(classifier.clone()));
            }
        }

        Ok(self.default_classifier())
    }

    fn default_classifier(&self) -> Option<SharedClassifier> {
        self.default_name
            .as_ref()
            .and_then(|name| self.classifiers.get(name).cloned())
    }
}

impl Default for ClassifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}
