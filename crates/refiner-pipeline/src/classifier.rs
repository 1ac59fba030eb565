//! Lexicon-based classifier used when no model backend is wired in.

use refiner_core::{Category, Classification, Classifier, ClassifierError};
use std::collections::BTreeMap;

const EXCELLENT_WORDS: &[&str] = &[
    "great",
    "excellent",
    "outstanding",
    "amazing",
    "perfect",
    "superb",
    "brilliant",
    "exceptional",
    "fantastic",
];
const GOOD_WORDS: &[&str] = &["good", "nice", "solid", "well", "helpful", "clear", "pleasant"];
const AVERAGE_WORDS: &[&str] = &["okay", "ok", "average", "fine", "decent", "adequate", "mediocre"];
const POOR_WORDS: &[&str] = &[
    "poor",
    "bad",
    "terrible",
    "awful",
    "wrong",
    "broken",
    "worst",
    "useless",
    "disappointing",
];

/// Scores a text by counting keyword hits per category.
///
/// The score of a candidate is its share of all hits. Ties go to the
/// earlier candidate. A text without any hit falls back to
/// [`Category::Average`] (or the first candidate if that one is not offered)
/// with uniform scores.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    lexicon: BTreeMap<Category, Vec<String>>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        let words =
            |list: &[&str]| -> Vec<String> { list.iter().map(|w| (*w).to_string()).collect() };
        let lexicon = [
            (Category::Excellent, words(EXCELLENT_WORDS)),
            (Category::Good, words(GOOD_WORDS)),
            (Category::Average, words(AVERAGE_WORDS)),
            (Category::Poor, words(POOR_WORDS)),
        ]
        .into_iter()
        .collect();
        Self { lexicon }
    }
}

impl KeywordClassifier {
    /// Replaces the keywords of `category`. Keywords are matched case-insensitively.
    #[must_use]
    pub fn with_keywords<I, S>(mut self, category: Category, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.into().to_lowercase())
            .collect();
        self.lexicon.insert(category, keywords);
        self
    }

    fn hits(&self, category: Category, tokens: &[String]) -> usize {
        self.lexicon.get(&category).map_or(0, |words| {
            tokens.iter().filter(|t| words.contains(*t)).count()
        })
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl Classifier for KeywordClassifier {
    fn classify(
        &self,
        text: &str,
        candidates: &[Category],
    ) -> Result<Classification, ClassifierError> {
        if candidates.is_empty() {
            return Err(ClassifierError::NoCandidates);
        }
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Err(ClassifierError::EmptyText);
        }

        let hits: Vec<(Category, usize)> = candidates
            .iter()
            .map(|c| (*c, self.hits(*c, &tokens)))
            .collect();
        let total: usize = hits.iter().map(|(_, h)| h).sum();

        #[allow(clippy::cast_precision_loss)]
        let (label, scores) = if total == 0 {
            let label = if candidates.contains(&Category::Average) {
                Category::Average
            } else {
                candidates[0]
            };
            let uniform = 1.0 / candidates.len() as f64;
            let scores = candidates
                .iter()
                .map(|c| (c.label().to_string(), uniform))
                .collect();
            (label, scores)
        } else {
            let mut best = hits[0];
            for h in &hits[1..] {
                if h.1 > best.1 {
                    best = *h;
                }
            }
            let scores = hits
                .iter()
                .map(|(c, h)| (c.label().to_string(), *h as f64 / total as f64))
                .collect();
            (best.0, scores)
        };

        Ok(Classification {
            label: label.label().to_string(),
            scores,
        })
    }
}
