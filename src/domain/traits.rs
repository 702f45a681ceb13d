// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The collaborators the pipeline consumes without knowing
// their concrete implementation:
//
//   CorpusSource  → JsonlCorpus, or an in-memory corpus in tests
//   WordSegmenter → LexiconSegmenter, or none at all

use crate::domain::example::RawExample;
use crate::error::PipelineResult;

/// The three named splits a corpus exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitName {
    Train,
    Validation,
    Test,
}

impl SplitName {
    pub fn as_str(self) -> &'static str {
        match self {
            SplitName::Train      => "train",
            SplitName::Validation => "validation",
            SplitName::Test       => "test",
        }
    }
}

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can hand out the labelled sentences of a split.
pub trait CorpusSource {
    /// Load one split. `Ok(None)` means the source has no such split.
    fn load_split(&self, split: SplitName) -> PipelineResult<Option<Vec<RawExample>>>;
}

// ─── WordSegmenter ────────────────────────────────────────────────────────────
/// Optional pre-tokenisation step for languages whose words span
/// several whitespace-separated syllables.
pub trait WordSegmenter: Send + Sync {
    /// Return the sentence with multi-syllable words joined into single tokens.
    fn segment(&self, text: &str) -> String;
}

/// A corpus already held in memory, split by split.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCorpus {
    pub train:      Vec<RawExample>,
    pub validation: Option<Vec<RawExample>>,
    pub test:       Vec<RawExample>,
}

impl CorpusSource for InMemoryCorpus {
    fn load_split(&self, split: SplitName) -> PipelineResult<Option<Vec<RawExample>>> {
        Ok(match split {
            SplitName::Train      => Some(self.train.clone()),
            SplitName::Validation => self.validation.clone(),
            SplitName::Test       => Some(self.test.clone()),
        })
    }
}
