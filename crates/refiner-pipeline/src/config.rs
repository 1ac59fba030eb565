//! Engine configuration, read from TOML.
//!
//! ```toml
//! seed = 42
//!
//! [learning]
//! learning_rate = 0.1
//! discount = 0.9
//! exploration_rate = 0.1
//!
//! [ratings]
//! "Excellent work" = 9
//! "Good work" = 7
//! "Average work" = 5
//! "Poor work" = 3
//!
//! [keywords]
//! "Excellent work" = ["great", "superb"]
//! ```
//!
//! Every section is optional and falls back to the defaults shown. Unknown
//! keys are rejected.

use crate::classifier::KeywordClassifier;
use crate::error::{RefineError, Result};
use crate::rating_map::RatingMap;
use refiner_bandits::LearningParams;
use refiner_core::Category;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub learning: LearningParams,
    #[serde(default = "EngineConfig::default_ratings")]
    pub ratings: BTreeMap<String, i32>,
    /// Keyword overrides per category label for the keyword classifier.
    #[serde(default)]
    pub keywords: BTreeMap<String, Vec<String>>,
    /// Seed for exploration. Unset means seeded from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            learning: LearningParams::default(),
            ratings: Self::default_ratings(),
            keywords: BTreeMap::new(),
            seed: None,
        }
    }
}

impl EngineConfig {
    fn default_ratings() -> BTreeMap<String, i32> {
        [
            (Category::Excellent, 9),
            (Category::Good, 7),
            (Category::Average, 5),
            (Category::Poor, 3),
        ]
        .into_iter()
        .map(|(c, r)| (c.label().to_string(), r))
        .collect()
    }

    /// Loads the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(
                "No config file found at {}. Using EngineConfig::default().",
                path.display()
            );
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|e| {
            RefineError::Configuration(format!("reading config file {}: {e}", path.display()))
        })?;
        Self::from_toml(&text).map_err(|e| match e {
            RefineError::Configuration(msg) => {
                RefineError::Configuration(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| RefineError::Configuration(e.to_string()))
    }

    pub fn learning_params(&self) -> Result<LearningParams> {
        self.learning.validate()?;
        Ok(self.learning)
    }

    /// Rating map for the configured labels; must cover every category.
    pub fn rating_map(&self) -> Result<RatingMap> {
        let map = RatingMap::from_labels(&self.ratings)?;
        map.validate_complete()?;
        Ok(map)
    }

    pub fn classifier(&self) -> Result<KeywordClassifier> {
        let mut classifier = KeywordClassifier::default();
        for (label, words) in &self.keywords {
            let category = Category::from_label(label).ok_or_else(|| {
                RefineError::Configuration(format!("unknown category label in keywords: {label:?}"))
            })?;
            classifier = classifier.with_keywords(category, words.iter().cloned());
        }
        Ok(classifier)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use refiner_core::Classifier;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = EngineConfig::from_toml("").unwrap();
        assert_eq!(cfg.learning, LearningParams::default());
        assert_eq!(cfg.seed, None);
        assert_eq!(cfg.rating_map().unwrap(), RatingMap::default());
    }

    #[test]
    fn partial_learning_section_keeps_other_defaults() {
        let cfg = EngineConfig::from_toml("seed = 3\n[learning]\nexploration_rate = 0.0\n").unwrap();
        assert_eq!(cfg.seed, Some(3));
        assert!((cfg.learning.exploration_rate - 0.0).abs() < f64::EPSILON);
        assert!((cfg.learning.learning_rate - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_learning_params_are_rejected() {
        let cfg = EngineConfig::from_toml("[learning]\ndiscount = 2.0\n").unwrap();
        let err = cfg.learning_params().unwrap_err();
        assert!(matches!(err, RefineError::Bandit(_)));
        assert!(err.is_fatal());
        assert_eq!(err.stage(), "policy");
    }

    #[test]
    fn incomplete_ratings_are_a_configuration_error() {
        let cfg = EngineConfig::from_toml("[ratings]\n\"Good work\" = 7\n").unwrap();
        assert!(matches!(cfg.rating_map(), Err(RefineError::Configuration(_))));
    }

    #[test]
    fn keyword_overrides_apply() {
        let cfg = EngineConfig::from_toml("[keywords]\n\"Poor work\" = [\"meh\"]\n").unwrap();
        let c = cfg.classifier().unwrap().classify("meh", &Category::ALL).unwrap();
        assert_eq!(c.label, "Poor work");

        let cfg = EngineConfig::from_toml("[keywords]\n\"Great\" = [\"x\"]\n").unwrap();
        assert!(cfg.classifier().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EngineConfig::from_toml("[learning]\nlearnin_rate = 0.5\n").unwrap_err();
        assert!(matches!(err, RefineError::Configuration(_)));
        assert!(err.to_string().contains("learnin_rate"));

        let err = EngineConfig::from_toml("sed = 3\n").unwrap_err();
        assert!(err.to_string().contains("sed"));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EngineConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg.learning, LearningParams::default());
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refiner.toml");
        fs::write(&path, "[learning\n").unwrap();
        let err = EngineConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("refiner.toml"));
    }
}
