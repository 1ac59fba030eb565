//! Contract for text classifiers.

use crate::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Result of a single classification call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Best label. Callers must check it against the candidates they offered.
    pub label: String,
    /// Score in [0, 1] per label.
    pub scores: BTreeMap<String, f64>,
}

impl Classification {
    /// Score of the best label, clamped to [0, 1]. Missing or non-finite
    /// scores count as 0.
    pub fn confidence(&self) -> f64 {
        self.scores
            .get(&self.label)
            .copied()
            .filter(|s| s.is_finite())
            .map_or(0.0, |s| s.clamp(0.0, 1.0))
    }
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("empty input text")]
    EmptyText,
    #[error("no candidate labels given")]
    NoCandidates,
    #[error("classifier backend failed: {0}")]
    Backend(String),
}

/// Maps a text to one label out of `candidates`.
pub trait Classifier {
    fn classify(&self, text: &str, candidates: &[Category])
        -> Result<Classification, ClassifierError>;
}

impl<C: Classifier + ?Sized> Classifier for &C {
    fn classify(
        &self,
        text: &str,
        candidates: &[Category],
    ) -> Result<Classification, ClassifierError> {
        (**self).classify(text, candidates)
    }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn classify(
        &self,
        text: &str,
        candidates: &[Category],
    ) -> Result<Classification, ClassifierError> {
        (**self).classify(text, candidates)
    }
}
