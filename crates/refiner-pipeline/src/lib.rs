#![warn(clippy::unwrap_used, clippy::expect_used)]

//! Batch refinement of classifier ratings.
//!
//! Every record runs once through
//! `classified → rating mapped → action selected → reward computed → policy updated → recorded`.
//! Records that fail on the way are kept as [`FailedRecord`]s and skipped for
//! reward and update; only configuration errors abort a batch.
//!
//! The [`PolicyTable`] is borrowed mutably for the whole batch, so nothing
//! else can read-modify-write it while records are processed. Learning lasts
//! as long as the caller keeps the table; a fresh process starts from zero
//! unless a snapshot is loaded.

pub mod classifier;
pub mod config;
pub mod error;
pub mod rating_map;
pub mod storage;

pub use classifier::KeywordClassifier;
pub use config::EngineConfig;
pub use error::{RefineError, Result};
pub use rating_map::RatingMap;
pub use storage::{BlobSink, JsonDocumentSink, ListSink, PersistReceipt, StorageError, StorageSink};

use rand::Rng;
use refiner_bandits::{reward, select_action, update, LearningParams};
use refiner_core::{
    BatchReport, BatchSummary, Category, Classifier, CleanedRecord, FailedRecord, PolicyTable,
    RecordResult, RefinementRecord,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Running reward totals of a batch.
#[derive(Debug, Default, Clone)]
pub struct RewardStatistics {
    /// Records that went through the update.
    pub refined: usize,
    pub failed: usize,
    pub total_reward: f64,
}

impl RewardStatistics {
    /// Mean reward of refined records; 0 for an empty batch.
    #[must_use]
    pub fn average_reward(&self) -> f64 {
        if self.refined == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let refined = self.refined as f64;
        self.total_reward / refined
    }

    fn summary(&self, table: &PolicyTable) -> BatchSummary {
        BatchSummary {
            average_reward: self.average_reward(),
            q_table: table.clone(),
            refined: self.refined,
            failed: self.failed,
        }
    }
}

/// Drives records through classification, refinement and policy update.
pub struct BatchOrchestrator<C, R> {
    classifier: C,
    ratings: RatingMap,
    params: LearningParams,
    rng: R,
    stop: Option<Arc<AtomicBool>>,
}

impl<C: Classifier, R: Rng> BatchOrchestrator<C, R> {
    pub fn new(classifier: C, ratings: RatingMap, params: LearningParams, rng: R) -> Self {
        Self {
            classifier,
            ratings,
            params,
            rng,
            stop: None,
        }
    }

    /// Once `flag` is set, no further record is started. The record in
    /// flight always completes.
    #[must_use]
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    /// Refines already parsed records.
    pub fn refine_batch(
        &mut self,
        table: &mut PolicyTable,
        records: &[CleanedRecord],
    ) -> Result<BatchReport> {
        self.run(table, records.iter().map(Ok))
    }

    /// Refines raw JSON records. Records that do not parse fail on their own.
    pub fn refine_values(&mut self, table: &mut PolicyTable, values: Vec<Value>) -> Result<BatchReport> {
        let parsed: Vec<std::result::Result<CleanedRecord, FailedRecord>> = values
            .into_iter()
            .enumerate()
            .map(|(idx, value)| {
                let id = value
                    .get("id")
                    .and_then(Value::as_str)
                    .map_or_else(|| format!("#{idx}"), str::to_string);
                serde_json::from_value(value).map_err(|e| failed(id, &RefineError::from(e)))
            })
            .collect();
        self.run(table, parsed.iter().map(|r| r.as_ref().map_err(Clone::clone)))
    }

    /// Refines JSON Lines input, one raw line per item. Blank lines are
    /// skipped. A line that is not valid UTF-8 or not a valid record fails
    /// on its own under the id `line <n>` (1-based) unless it carries a
    /// readable `id`.
    pub fn refine_lines<I, S>(&mut self, table: &mut PolicyTable, lines: I) -> Result<BatchReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let parsed: Vec<std::result::Result<CleanedRecord, FailedRecord>> = lines
            .into_iter()
            .enumerate()
            .filter(|(_, line)| !line.as_ref().iter().all(u8::is_ascii_whitespace))
            .map(|(idx, line)| {
                let line = line.as_ref();
                serde_json::from_slice::<CleanedRecord>(line).map_err(|e| {
                    let id = serde_json::from_slice::<Value>(line)
                        .ok()
                        .and_then(|v| v.get("id").and_then(Value::as_str).map(str::to_string))
                        .unwrap_or_else(|| format!("line {}", idx + 1));
                    failed(id, &RefineError::from(e))
                })
            })
            .collect();
        self.run(table, parsed.iter().map(|r| r.as_ref().map_err(Clone::clone)))
    }

    fn run<'a, I>(&mut self, table: &mut PolicyTable, records: I) -> Result<BatchReport>
    where
        I: Iterator<Item = std::result::Result<&'a CleanedRecord, FailedRecord>>,
    {
        let mut stats = RewardStatistics::default();
        let mut results = Vec::new();

        for record in records {
            if self.stop.as_ref().is_some_and(|f| f.load(Ordering::SeqCst)) {
                tracing::info!("Stop requested after {} records", results.len());
                break;
            }
            let outcome = match record {
                Ok(record) => match self.refine_record(table, record) {
                    Ok(refined) => Ok(refined),
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => Err(failed(record.id.clone(), &e)),
                },
                Err(f) => Err(f),
            };
            match outcome {
                Ok(refined) => {
                    stats.refined += 1;
                    stats.total_reward += refined.reward;
                    results.push(RecordResult::Refined(refined));
                }
                Err(f) => {
                    tracing::warn!("Record {} failed at {}: {}", f.id, f.stage, f.error);
                    stats.failed += 1;
                    results.push(RecordResult::Failed(f));
                }
            }
        }

        let summary = stats.summary(table);
        tracing::info!(
            "Batch done: {} refined, {} failed, average reward {:.3}",
            summary.refined,
            summary.failed,
            summary.average_reward
        );
        Ok(BatchReport { results, summary })
    }

    fn refine_record(
        &mut self,
        table: &mut PolicyTable,
        record: &CleanedRecord,
    ) -> Result<RefinementRecord> {
        if record.text.trim().is_empty() {
            return Err(RefineError::InvalidRecord("empty text".to_string()));
        }

        let classification = self.classifier.classify(&record.text, &Category::ALL)?;
        let category = Category::from_label(&classification.label).ok_or_else(|| {
            RefineError::ClassifierContractViolation {
                label: classification.label.clone(),
            }
        })?;
        let confidence = classification.confidence();

        let baseline = self.ratings.lookup(category)?;

        let action = select_action(table, category, self.params.exploration_rate, &mut self.rng);
        let refined = action.apply(baseline);

        let reward = reward(refined, record.rating);

        // Single-step update: the next state is the current category.
        let value = update(table, category, action, reward, category, &self.params);
        tracing::debug!(
            "Record {}: {category} baseline {baseline} -> {refined} via {action}, reward {reward}, value {value:.4}",
            record.id
        );

        Ok(RefinementRecord {
            id: record.id.clone(),
            text: record.text.clone(),
            category,
            confidence,
            baseline_rating: baseline,
            refined_rating: refined,
            action,
            reward,
            timestamp: record.timestamp.clone(),
        })
    }
}

fn failed(id: String, error: &RefineError) -> FailedRecord {
    FailedRecord {
        id,
        stage: error.stage().to_string(),
        error: error.to_string(),
    }
}
