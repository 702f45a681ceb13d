// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores any saved checkpoint on the corpus test split, using
// the tokenizer stored in the same run directory.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::setup::{build_pipeline, staged};
use crate::data::{encoder::SentenceEncoder, loader::JsonlCorpus};
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::{
    controller::evaluate,
    report::EvaluationReport,
    ComputeBackend, ComputeDevice,
};

#[derive(Debug, Clone)]
pub struct EvaluateSettings {
    pub data_dir:        PathBuf,
    pub lexicon:         Option<PathBuf>,
    pub checkpoint_dir:  PathBuf,
    pub checkpoint_name: String,
    pub batch_size:      usize,
    pub max_seq_len:     usize,
}

pub struct EvaluateUseCase {
    settings: EvaluateSettings,
}

impl EvaluateUseCase {
    pub fn new(settings: EvaluateSettings) -> Self {
        Self { settings }
    }

    pub fn execute(&self) -> Result<EvaluationReport> {
        let s      = &self.settings;
        let device = ComputeDevice::default();

        let tokenizer = TokenizerStore::new(&s.checkpoint_dir)
            .load()
            .with_context(|| format!("No tokenizer in '{}'", s.checkpoint_dir.display()))?;
        let (model, meta) = CheckpointManager::new(&s.checkpoint_dir, &s.checkpoint_name)
            .load_model::<ComputeBackend>(&device)
            .with_context(|| format!("Cannot load checkpoint from '{}'", s.checkpoint_dir.display()))?;

        let max_len = match meta.model.max_seq_len() {
            Some(limit) => s.max_seq_len.min(limit),
            None        => s.max_seq_len,
        };
        let encoder  = SentenceEncoder::new(tokenizer, max_len)?;
        let pipeline = build_pipeline(s.lexicon.as_deref())?;
        let test     = pipeline
            .label_test_split(&JsonlCorpus::new(&s.data_dir))
            .and_then(|t| pipeline.encode_examples(&t, &encoder))
            .map_err(|e| staged(e, "preparing the test split"))?;
        tracing::info!("Evaluating {} model on {} test examples", meta.model.label(), test.len());

        evaluate(&model, test, s.batch_size, encoder.pad_id(), max_len, &device)
            .map_err(|e| staged(e, "evaluation"))
    }
}
