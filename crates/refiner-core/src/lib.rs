//! Core types shared by the refiner crates.
//!
//! The closed label sets ([`Category`], [`Action`]), the learned
//! [`PolicyTable`] and the per-record result types live here so that the
//! bandit crate, the pipeline and the CLI agree on one wire format.

pub mod classify;
pub mod record;
pub mod report;

pub use classify::{Classification, Classifier, ClassifierError};
pub use record::{CleanedRecord, Rating};
pub use report::{BatchReport, BatchSummary, FailedRecord, RecordResult, RefinementRecord};

use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

/// Lowest rating a record can carry after refinement.
pub const MIN_RATING: i32 = 1;
/// Highest rating a record can carry after refinement.
pub const MAX_RATING: i32 = 10;

/// Quality tier assigned to a text record by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Excellent work")]
    Excellent,
    #[serde(rename = "Good work")]
    Good,
    #[serde(rename = "Average work")]
    Average,
    #[serde(rename = "Poor work")]
    Poor,
}

impl Category {
    /// All categories, in the order they are offered to the classifier.
    pub const ALL: [Category; 4] = [
        Category::Excellent,
        Category::Good,
        Category::Average,
        Category::Poor,
    ];

    /// The label exchanged with classifiers and written to JSON.
    pub fn label(self) -> &'static str {
        match self {
            Category::Excellent => "Excellent work",
            Category::Good => "Good work",
            Category::Average => "Average work",
            Category::Poor => "Poor work",
        }
    }

    /// Parses a classifier label. Anything outside the closed set is `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Adjustment applied to a baseline rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Decrease,
    Hold,
    Increase,
}

impl Action {
    /// All actions. Greedy selection breaks ties in favour of the earlier entry.
    pub const ALL: [Action; 3] = [Action::Decrease, Action::Hold, Action::Increase];

    /// Rating delta this action applies.
    pub fn delta(self) -> i32 {
        match self {
            Action::Decrease => -1,
            Action::Hold => 0,
            Action::Increase => 1,
        }
    }

    /// Applies the action to `baseline`, clamped to the rating range.
    pub fn apply(self, baseline: i32) -> i32 {
        baseline
            .saturating_add(self.delta())
            .clamp(MIN_RATING, MAX_RATING)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Decrease => "decrease",
            Action::Hold => "hold",
            Action::Increase => "increase",
        })
    }
}

/// Learned values of one category, one per [`Action`].
///
/// Every action has a slot, so an entry can never be partial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub decrease: f64,
    pub hold: f64,
    pub increase: f64,
}

impl PolicyEntry {
    pub fn value(&self, action: Action) -> f64 {
        match action {
            Action::Decrease => self.decrease,
            Action::Hold => self.hold,
            Action::Increase => self.increase,
        }
    }

    pub fn value_mut(&mut self, action: Action) -> &mut f64 {
        match action {
            Action::Decrease => &mut self.decrease,
            Action::Hold => &mut self.hold,
            Action::Increase => &mut self.increase,
        }
    }

    /// Highest value across all actions.
    pub fn max_value(&self) -> f64 {
        Action::ALL
            .iter()
            .map(|a| self.value(*a))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Action with the highest value; ties go to the earliest in [`Action::ALL`].
    pub fn best_action(&self) -> Action {
        let mut best = Action::ALL[0];
        for action in &Action::ALL[1..] {
            if self.value(*action) > self.value(best) {
                best = *action;
            }
        }
        best
    }
}

/// Mapping from category (state) to learned action values.
///
/// Serializes as `{"<category label>": {"decrease": .., "hold": .., "increase": ..}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyTable(BTreeMap<Category, PolicyEntry>);

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, state: Category) -> Option<&PolicyEntry> {
        self.0.get(&state)
    }

    /// Returns the entry for `state`, registering an all-zero entry first if
    /// the category has not been seen.
    pub fn entry_mut(&mut self, state: Category) -> &mut PolicyEntry {
        self.0.entry(state).or_default()
    }

    pub fn contains(&self, state: Category) -> bool {
        self.0.contains_key(&state)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Category, PolicyEntry> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a PolicyTable {
    type Item = (&'a Category, &'a PolicyEntry);
    type IntoIter = btree_map::Iter<'a, Category, PolicyEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
