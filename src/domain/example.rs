// ============================================================
// Layer 3 — Labelled Example Domain Types
// ============================================================
// Two distinct types describe a sentence on its way into the model:
//
//   RawExample → label exactly as the source corpus stores it
//                (0 = negative, 1 = neutral, 2 = positive)
//   Example    → label in canonical order
//                (0 = negative, 1 = positive, 2 = neutral)
//
// The only way to obtain an Example from a RawExample is
// RawExample::canonicalize, so the 1 ↔ 2 swap is applied
// exactly once per example.

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Number of sentiment classes.
pub const NUM_CLASSES: usize = 3;

/// Sentiment classes in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sentiment {
    Negative = 0,
    Positive = 1,
    Neutral  = 2,
}

impl Sentiment {
    pub const ALL: [Sentiment; NUM_CLASSES] =
        [Sentiment::Negative, Sentiment::Positive, Sentiment::Neutral];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Sentiment::Negative => "negative",
            Sentiment::Positive => "positive",
            Sentiment::Neutral  => "neutral",
        }
    }
}

/// Swap raw label indices 1 and 2, leaving 0 untouched.
///
/// This is an involution on `{0, 1, 2}`: applying it twice is the identity.
/// Values outside that set are returned unchanged; range checking is the
/// caller's job (see [`RawExample::validate`]).
pub fn swap_raw_label(label: i64) -> i64 {
    match label {
        1 => 2,
        2 => 1,
        other => other,
    }
}

/// A sentence with its label as stored by the source corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawExample {
    pub text:  String,
    pub label: i64,
}

impl RawExample {
    pub fn new(text: impl Into<String>, label: i64) -> Self {
        Self { text: text.into(), label }
    }

    /// Check the label is one of the three known classes.
    pub fn validate(&self, split: &str, index: usize) -> Result<(), DataError> {
        if (0..NUM_CLASSES as i64).contains(&self.label) {
            Ok(())
        } else {
            Err(DataError::InvalidLabel { split: split.to_string(), index, label: self.label })
        }
    }

    /// Convert into the canonical label ordering.
    pub fn canonicalize(self, split: &str, index: usize) -> Result<Example, DataError> {
        self.validate(split, index)?;
        let canonical = swap_raw_label(self.label) as usize;
        let label = Sentiment::from_index(canonical).ok_or(DataError::InvalidLabel {
            split: split.to_string(),
            index,
            label: self.label,
        })?;
        Ok(Example { text: self.text, label })
    }
}

/// A sentence whose label is already in canonical order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub text:  String,
    pub label: Sentiment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_is_involution() {
        for x in 0..3 {
            assert_eq!(swap_raw_label(swap_raw_label(x)), x);
        }
        assert_eq!(swap_raw_label(0), 0);
        assert_eq!(swap_raw_label(1), 2);
        assert_eq!(swap_raw_label(2), 1);
    }

    #[test]
    fn test_canonicalize_swaps_positive_and_neutral() {
        let neutral  = RawExample::new("bình thường", 1).canonicalize("train", 0).unwrap();
        let positive = RawExample::new("rất hay", 2).canonicalize("train", 1).unwrap();
        let negative = RawExample::new("chán", 0).canonicalize("train", 2).unwrap();
        assert_eq!(neutral.label,  Sentiment::Neutral);
        assert_eq!(positive.label, Sentiment::Positive);
        assert_eq!(negative.label, Sentiment::Negative);
    }

    #[test]
    fn test_out_of_range_label_is_rejected() {
        let err = RawExample::new("?", 3).canonicalize("test", 7).unwrap_err();
        assert_eq!(
            err,
            DataError::InvalidLabel { split: "test".into(), index: 7, label: 3 }
        );
        assert!(RawExample::new("?", -1).validate("test", 0).is_err());
    }

    #[test]
    fn test_sentiment_index_roundtrip() {
        for s in Sentiment::ALL {
            assert_eq!(Sentiment::from_index(s.index()), Some(s));
        }
        assert_eq!(Sentiment::from_index(3), None);
    }
}
