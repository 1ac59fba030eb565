//! Per-record results and the batch document handed to storage.

use crate::{Action, Category, PolicyTable};
use serde::{Deserialize, Serialize};

/// Outcome of refining one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementRecord {
    pub id: String,
    pub text: String,
    pub category: Category,
    /// Classifier score of `category`, in [0, 1].
    pub confidence: f64,
    pub baseline_rating: i32,
    pub refined_rating: i32,
    pub action: Action,
    pub reward: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// A record that was aborted at record scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRecord {
    pub id: String,
    /// Processing stage that failed, e.g. `"parse"` or `"classify"`.
    pub stage: String,
    pub error: String,
}

/// One entry of [`BatchReport::results`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RecordResult {
    Refined(RefinementRecord),
    Failed(FailedRecord),
}

impl RecordResult {
    pub fn id(&self) -> &str {
        match self {
            RecordResult::Refined(r) => &r.id,
            RecordResult::Failed(f) => &f.id,
        }
    }

    pub fn as_refined(&self) -> Option<&RefinementRecord> {
        match self {
            RecordResult::Refined(r) => Some(r),
            RecordResult::Failed(_) => None,
        }
    }
}

/// Aggregate view of a finished batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Mean reward over refined records; 0 when there are none.
    pub average_reward: f64,
    /// Copy of the policy table taken when the batch finished.
    pub q_table: PolicyTable,
    #[serde(default)]
    pub refined: usize,
    #[serde(default)]
    pub failed: usize,
}

/// Document persisted for every batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<RecordResult>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn refined(&self) -> impl Iterator<Item = &RefinementRecord> {
        self.results.iter().filter_map(RecordResult::as_refined)
    }
}
