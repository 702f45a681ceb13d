// ============================================================
// Layer 2 — FinetuneUseCase
// ============================================================
// Trains one classifier with plain cross-entropy; its output
// directory can later serve as the teacher of a distillation run.
//
//   Step 1: Seed the RandomSource from the run config
//   Step 2: Prepare the corpus + tokenizer   (setup.rs)
//   Step 3: Build the model from its ModelSpec (Layer 5 - ml)
//   Step 4: Run the epoch loop               (Layer 5 - ml)

use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::application::setup::{prepare_corpus, staged, ArchitectureSettings, CorpusSettings};
use crate::ml::{
    config::FinetuneConfig,
    controller::run_finetune,
    report::TrainingReport,
    ComputeDevice, TrainBackend,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinetuneSettings {
    pub corpus:       CorpusSettings,
    pub architecture: ArchitectureSettings,
    pub config:       FinetuneConfig,
}

pub struct FinetuneUseCase {
    settings: FinetuneSettings,
}

impl FinetuneUseCase {
    pub fn new(settings: FinetuneSettings) -> Self {
        Self { settings }
    }

    pub fn execute(&self) -> Result<TrainingReport> {
        let s   = &self.settings;
        let run = &s.config.run;

        let mut rng = StdRng::seed_from_u64(run.seed);
        let device  = ComputeDevice::default();
        tracing::info!("Using device: {:?}", device);

        let prepared = prepare_corpus(&s.corpus, &run.checkpoint_dir, None, run.max_seq_len, &mut rng)?;

        let spec  = s.architecture.spec(prepared.vocab_size, run.max_seq_len);
        let model = spec.init_seeded::<TrainBackend, _>(&device, &mut rng);

        run_finetune(&spec, model, &prepared.splits, &s.config, prepared.pad_id, &device, &mut rng)
            .map_err(|e| staged(e, "fine-tuning"))
    }
}
