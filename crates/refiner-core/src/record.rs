//! Input records as delivered by the cleaning stage.
//!
//! A [`CleanedRecord`] is already deduplicated and normalized. Its ground
//! truth is a [`Rating`], which may be absent: sources write the sentinel
//! string `"no-rating"`, `null`, or leave the field out.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Sentinel written by sources for records without a ground-truth rating.
pub const NO_RATING: &str = "no-rating";

/// Ground-truth rating of a record, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rating {
    Rated(i32),
    #[default]
    NoRating,
}

impl Rating {
    pub fn value(self) -> Option<i32> {
        match self {
            Rating::Rated(v) => Some(v),
            Rating::NoRating => None,
        }
    }
}

impl From<Option<i32>> for Rating {
    fn from(v: Option<i32>) -> Self {
        v.map_or(Rating::NoRating, Rating::Rated)
    }
}

impl Serialize for Rating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rating::Rated(v) => serializer.serialize_i32(*v),
            Rating::NoRating => serializer.serialize_str(NO_RATING),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRating {
    Int(i64),
    Float(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<RawRating>::deserialize(deserializer)? {
            None => Ok(Rating::NoRating),
            Some(RawRating::Int(v)) => i32::try_from(v)
                .map(Rating::Rated)
                .map_err(|_| de::Error::custom(format!("rating out of range: {v}"))),
            Some(RawRating::Float(v))
                if v.is_finite()
                    && v.fract() == 0.0
                    && v >= f64::from(i32::MIN)
                    && v <= f64::from(i32::MAX) =>
            {
                #[allow(clippy::cast_possible_truncation)]
                let v = v as i32;
                Ok(Rating::Rated(v))
            }
            Some(RawRating::Float(v)) => Err(de::Error::custom(format!(
                "rating must be a whole number, got {v}"
            ))),
            Some(RawRating::Text(s)) if s == NO_RATING => Ok(Rating::NoRating),
            Some(RawRating::Text(s)) => Err(de::Error::custom(format!(
                "expected an integer rating or \"{NO_RATING}\", got \"{s}\""
            ))),
        }
    }
}

/// One cleaned text record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleanedRecord {
    /// Stable identifier of the record, e.g. an asset id.
    pub id: String,
    pub text: String,
    /// Ground truth; missing means no rating.
    #[serde(default)]
    pub rating: Rating,
    /// ISO-8601 timestamp of the record, if the source has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}
