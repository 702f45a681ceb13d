// ============================================================
// Layer 2 — Shared Run Setup
// ============================================================
// Steps every training use case performs before the epoch loop:
//
//   Step 1: Build the DataPipeline (optional lexicon segmenter)
//   Step 2: Load + rebalance + relabel the JSON-lines corpus
//   Step 3: Load / build the tokenizer, saved in the run dir
//   Step 4: Tokenise all three splits
//
// plus the architecture settings that become a ModelSpec once
// the vocabulary size is known.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::data::{
    encoder::SentenceEncoder,
    loader::JsonlCorpus,
    pipeline::{DataPipeline, PreparedSplits},
    segmenter::LexiconSegmenter,
};
use crate::domain::traits::WordSegmenter;
use crate::error::PipelineError;
use crate::infra::tokenizer_store::TokenizerStore;
use crate::ml::{
    adapter::ModelSpec,
    model::{PooledClassifierConfig, TransformerClassifierConfig},
};

/// Where the corpus lives and how its text is prepared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusSettings {
    /// Directory holding train.jsonl, test.jsonl and optionally validation.jsonl
    pub data_dir:   PathBuf,
    /// Multi-syllable word list for the segmenter, one entry per line
    pub lexicon:    Option<PathBuf>,
    /// Vocabulary size when a tokenizer has to be built from scratch
    pub vocab_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchitectureKind {
    Transformer,
    Pooled,
}

/// Architecture hyperparameters, independent of the vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureSettings {
    pub kind:       ArchitectureKind,
    pub d_model:    usize,
    pub num_heads:  usize,
    pub num_layers: usize,
    pub d_ff:       usize,
    pub hidden:     usize,
    pub dropout:    f64,
}

impl ArchitectureSettings {
    pub fn spec(&self, vocab_size: usize, max_seq_len: usize) -> ModelSpec {
        match self.kind {
            ArchitectureKind::Transformer => ModelSpec::Transformer(
                TransformerClassifierConfig::new(vocab_size)
                    .with_max_seq_len(max_seq_len)
                    .with_d_model(self.d_model)
                    .with_num_heads(self.num_heads)
                    .with_num_layers(self.num_layers)
                    .with_d_ff(self.d_ff)
                    .with_dropout(self.dropout),
            ),
            ArchitectureKind::Pooled => ModelSpec::Pooled(
                PooledClassifierConfig::new(vocab_size)
                    .with_d_model(self.d_model)
                    .with_hidden(self.hidden)
                    .with_dropout(self.dropout),
            ),
        }
    }
}

/// Tokenised splits plus what the model needs to know about the tokenizer.
pub struct PreparedCorpus {
    pub splits:     PreparedSplits,
    pub pad_id:     u32,
    pub vocab_size: usize,
}

pub fn build_pipeline(lexicon: Option<&Path>) -> Result<DataPipeline> {
    let segmenter: Option<Box<dyn WordSegmenter>> = match lexicon {
        Some(path) => {
            let seg = LexiconSegmenter::from_file(path)
                .with_context(|| format!("Cannot load lexicon '{}'", path.display()))?;
            tracing::info!("Word segmentation enabled ({} lexicon entries)", seg.len());
            Some(Box::new(seg))
        }
        None => None,
    };
    Ok(DataPipeline::new(segmenter))
}

/// Run the full data pipeline.
///
/// `tokenizer` is reused when given (distillation shares the teacher's
/// vocabulary); otherwise one is loaded from or built into `run_dir`.
/// Either way the tokenizer ends up saved in `run_dir`.
pub fn prepare_corpus<R: Rng + ?Sized>(
    settings:    &CorpusSettings,
    run_dir:     &Path,
    tokenizer:   Option<Tokenizer>,
    max_seq_len: usize,
    rng:         &mut R,
) -> Result<PreparedCorpus> {
    // ── Steps 1-2: load, rebalance, relabel ──────────────────────────────────
    let pipeline = build_pipeline(settings.lexicon.as_deref())?;
    let corpus   = JsonlCorpus::new(&settings.data_dir);
    tracing::info!("Loading corpus from '{}'", settings.data_dir.display());
    let labeled = pipeline.label_splits(&corpus, rng).map_err(|e| staged(e, "loading the corpus"))?;

    // ── Step 3: tokenizer ────────────────────────────────────────────────────
    let store = TokenizerStore::new(run_dir);
    let tokenizer = match tokenizer {
        Some(tok) => {
            store.save(&tok)?;
            tok
        }
        None => {
            let texts: Vec<String> = labeled.train.iter().map(|e| e.text.clone()).collect();
            store.load_or_build(&texts, settings.vocab_size)?
        }
    };

    // ── Step 4: tokenise ─────────────────────────────────────────────────────
    let encoder = SentenceEncoder::new(tokenizer, max_seq_len)?;
    let splits  = pipeline
        .encode_splits(&labeled, &encoder)
        .map_err(|e| staged(e, "tokenising the corpus"))?;
    tracing::info!("Tokenised corpus: vocab_size={}, pad_id={}", encoder.vocab_size(), encoder.pad_id());

    Ok(PreparedCorpus { splits, pad_id: encoder.pad_id(), vocab_size: encoder.vocab_size() })
}

/// Wrap a library error so the message names the stage it came from.
pub fn staged(err: PipelineError, action: &str) -> anyhow::Error {
    let stage = err.stage();
    anyhow::Error::new(err).context(format!("{action} failed during {stage}"))
}
