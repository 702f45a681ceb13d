// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Turns a raw corpus into class-balanced, canonically labelled,
// tokenised splits. Two steps, so the tokenizer can be built
// from the prepared training text in between:
//
//   DataPipeline::label_splits()
//     load splits ─▶ validate labels ─▶ rebalance (train, validation)
//                 ─▶ swap labels 1 ↔ 2 ─▶ clean + segment text
//
//   DataPipeline::encode_splits()
//     tokenise each sentence ─▶ EncodedExample (unpadded, ≤ max_len)
//
// The test split is never rebalanced.

use rand::Rng;

use crate::data::{
    dataset::EncodedExample,
    encoder::SentenceEncoder,
    preprocessor::Preprocessor,
    rebalance::rebalance,
    splitter::split_train_val,
};
use crate::domain::example::{Example, RawExample};
use crate::domain::traits::{CorpusSource, SplitName, WordSegmenter};
use crate::error::{DataError, PipelineResult};

/// Fraction of the training split kept for training when the corpus
/// has no validation split of its own.
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.9;

/// The three splits after rebalancing and label normalisation.
#[derive(Debug, Clone)]
pub struct LabeledSplits {
    pub train:      Vec<Example>,
    pub validation: Vec<Example>,
    pub test:       Vec<Example>,
}

/// The three splits after tokenisation.
#[derive(Debug, Clone)]
pub struct PreparedSplits {
    pub train:      Vec<EncodedExample>,
    pub validation: Vec<EncodedExample>,
    pub test:       Vec<EncodedExample>,
}

pub struct DataPipeline {
    preprocessor:   Preprocessor,
    segmenter:      Option<Box<dyn WordSegmenter>>,
    train_fraction: f64,
}

impl DataPipeline {
    pub fn new(segmenter: Option<Box<dyn WordSegmenter>>) -> Self {
        Self {
            preprocessor: Preprocessor::new(),
            segmenter,
            train_fraction: DEFAULT_TRAIN_FRACTION,
        }
    }

    pub fn with_train_fraction(mut self, fraction: f64) -> Self {
        self.train_fraction = fraction;
        self
    }

    /// Clean a sentence and, if a segmenter is configured, segment it.
    pub fn prepare_text(&self, text: &str) -> String {
        let clean = self.preprocessor.clean(text);
        match &self.segmenter {
            Some(seg) => seg.segment(&clean),
            None      => clean,
        }
    }

    /// Load, rebalance and canonicalise every split.
    pub fn label_splits<C, R>(&self, corpus: &C, rng: &mut R) -> PipelineResult<LabeledSplits>
    where
        C: CorpusSource + ?Sized,
        R: Rng + ?Sized,
    {
        let train = corpus
            .load_split(SplitName::Train)?
            .ok_or_else(|| DataError::EmptySplit { split: "train".into() })?;
        let test = corpus
            .load_split(SplitName::Test)?
            .ok_or_else(|| DataError::EmptySplit { split: "test".into() })?;

        let (train, validation) = match corpus.load_split(SplitName::Validation)? {
            Some(val) => (train, val),
            None => {
                tracing::warn!(
                    "Corpus has no validation split; holding out {:.0}% of train",
                    (1.0 - self.train_fraction) * 100.0
                );
                split_train_val(train, self.train_fraction, rng)
            }
        };

        let train      = rebalance(SplitName::Train.as_str(), train, rng)?;
        let validation = rebalance(SplitName::Validation.as_str(), validation, rng)?;

        let splits = LabeledSplits {
            train:      self.canonicalize(SplitName::Train, train)?,
            validation: self.canonicalize(SplitName::Validation, validation)?,
            test:       self.canonicalize(SplitName::Test, test)?,
        };

        tracing::info!(
            "Train Length: {} | Validation Length: {} | Test Length: {}",
            splits.train.len(),
            splits.validation.len(),
            splits.test.len()
        );
        Ok(splits)
    }

    /// Tokenise every split.
    pub fn encode_splits(
        &self,
        splits:  &LabeledSplits,
        encoder: &SentenceEncoder,
    ) -> PipelineResult<PreparedSplits> {
        Ok(PreparedSplits {
            train:      encode_all(&splits.train, encoder)?,
            validation: encode_all(&splits.validation, encoder)?,
            test:       encode_all(&splits.test, encoder)?,
        })
    }

    /// Canonicalise the test split alone, for scoring a saved model.
    pub fn label_test_split<C>(&self, corpus: &C) -> PipelineResult<Vec<Example>>
    where
        C: CorpusSource + ?Sized,
    {
        let test = corpus
            .load_split(SplitName::Test)?
            .ok_or_else(|| DataError::EmptySplit { split: "test".into() })?;
        self.canonicalize(SplitName::Test, test)
    }

    pub fn encode_examples(
        &self,
        examples: &[Example],
        encoder:  &SentenceEncoder,
    ) -> PipelineResult<Vec<EncodedExample>> {
        encode_all(examples, encoder)
    }

    /// Swap raw labels into canonical order (once) and prepare the text.
    fn canonicalize(&self, split: SplitName, raw: Vec<RawExample>) -> PipelineResult<Vec<Example>> {
        if raw.is_empty() {
            return Err(DataError::EmptySplit { split: split.as_str().to_string() }.into());
        }
        raw.into_iter()
            .enumerate()
            .map(|(i, ex)| {
                let mut ex = ex.canonicalize(split.as_str(), i)?;
                ex.text = self.prepare_text(&ex.text);
                Ok(ex)
            })
            .collect()
    }
}

fn encode_all(examples: &[Example], encoder: &SentenceEncoder) -> PipelineResult<Vec<EncodedExample>> {
    examples
        .iter()
        .map(|ex| {
            let (input_ids, attention_mask) = encoder.encode(&ex.text)?;
            Ok(EncodedExample { input_ids, attention_mask, label: ex.label })
        })
        .collect()
}
