use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::example::Sentiment;

/// One tokenised sentence with its canonical label.
/// Not padded: `input_ids.len()` is the real length, at most the max sequence length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedExample {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub label:          Sentiment,
}

impl EncodedExample {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

pub struct SentimentDataset {
    examples: Vec<EncodedExample>,
}

impl SentimentDataset {
    pub fn new(examples: Vec<EncodedExample>) -> Self { Self { examples } }
}

impl Dataset<EncodedExample> for SentimentDataset {
    fn get(&self, index: usize) -> Option<EncodedExample> {
        self.examples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.examples.len()
    }
}
