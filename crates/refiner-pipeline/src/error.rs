use refiner_bandits::BanditError;
use refiner_core::ClassifierError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefineError {
    /// Rating map or engine settings are inconsistent. Aborts the batch.
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Classifier returned label outside the candidate set: {label:?}")]
    ClassifierContractViolation { label: String },
    #[error("Classifier failed: {0}")]
    Classifier(#[from] ClassifierError),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Malformed record: {0}")]
    MalformedRecord(#[from] serde_json::Error),
    #[error(transparent)]
    Bandit(#[from] BanditError),
}

impl RefineError {
    /// Whether the error aborts the whole batch rather than a single record.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RefineError::Configuration(_) | RefineError::Bandit(_))
    }

    /// Processing stage a record-scope error is reported under.
    pub fn stage(&self) -> &'static str {
        match self {
            RefineError::Configuration(_) => "rating",
            RefineError::ClassifierContractViolation { .. } | RefineError::Classifier(_) => {
                "classify"
            }
            RefineError::InvalidRecord(_) => "validate",
            RefineError::MalformedRecord(_) => "parse",
            RefineError::Bandit(_) => "policy",
        }
    }
}

pub type Result<T> = std::result::Result<T, RefineError>;
