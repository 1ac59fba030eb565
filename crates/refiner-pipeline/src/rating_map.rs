//! Baseline rating per category.

use crate::error::{RefineError, Result};
use refiner_core::{Category, MAX_RATING, MIN_RATING};
use std::collections::BTreeMap;

/// Fixed lookup from category to a baseline rating in `MIN_RATING..=MAX_RATING`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingMap(BTreeMap<Category, i32>);

impl Default for RatingMap {
    fn default() -> Self {
        Self::new(
            [
                (Category::Excellent, 9),
                (Category::Good, 7),
                (Category::Average, 5),
                (Category::Poor, 3),
            ]
            .into_iter()
            .collect(),
        )
    }
}

impl RatingMap {
    /// Builds a map, clamping every rating into range. The map may be
    /// partial; see [`RatingMap::validate_complete`].
    pub fn new(ratings: BTreeMap<Category, i32>) -> Self {
        Self(
            ratings
                .into_iter()
                .map(|(c, r)| (c, r.clamp(MIN_RATING, MAX_RATING)))
                .collect(),
        )
    }

    /// Builds a map from classifier labels. Unknown labels are rejected.
    pub fn from_labels(ratings: &BTreeMap<String, i32>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for (label, rating) in ratings {
            let category = Category::from_label(label).ok_or_else(|| {
                RefineError::Configuration(format!("unknown category label in rating map: {label:?}"))
            })?;
            map.insert(category, *rating);
        }
        Ok(Self::new(map))
    }

    /// Fails if any category lacks a rating.
    pub fn validate_complete(&self) -> Result<()> {
        let missing: Vec<&str> = Category::ALL
            .iter()
            .filter(|c| !self.0.contains_key(c))
            .map(|c| c.label())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RefineError::Configuration(format!(
                "rating map has no entry for: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn lookup(&self, category: Category) -> Result<i32> {
        self.0.get(&category).copied().ok_or_else(|| {
            RefineError::Configuration(format!("no baseline rating for category {category:?}"))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_map_is_complete() {
        let map = RatingMap::default();
        assert!(map.validate_complete().is_ok());
        assert_eq!(map.lookup(Category::Excellent).unwrap(), 9);
        assert_eq!(map.lookup(Category::Poor).unwrap(), 3);
    }

    #[test]
    fn ratings_are_clamped() {
        let map = RatingMap::new([(Category::Good, 42), (Category::Poor, -1)].into_iter().collect());
        assert_eq!(map.lookup(Category::Good).unwrap(), 10);
        assert_eq!(map.lookup(Category::Poor).unwrap(), 1);
    }

    #[test]
    fn missing_category_is_a_configuration_error() {
        let map = RatingMap::new([(Category::Good, 7)].into_iter().collect());
        let err = map.lookup(Category::Excellent).unwrap_err();
        assert!(matches!(err, RefineError::Configuration(_)));
        assert!(err.is_fatal());

        let err = map.validate_complete().unwrap_err();
        assert!(err.to_string().contains("Excellent work"));
    }

    #[test]
    fn unknown_labels_are_rejected() {
        let mut labels = BTreeMap::new();
        labels.insert("Stellar work".to_string(), 10);
        assert!(matches!(
            RatingMap::from_labels(&labels),
            Err(RefineError::Configuration(_))
        ));
    }
}
