// ============================================================
// Layer 5 — Run Configuration
// ============================================================
// One explicit configuration structure per kind of run:
//
//   FinetuneConfig  { run: LoopConfig, optimizer }
//   DistillConfig   { run: LoopConfig, optimizer,
//                     temperature, soft_weight, hard_weight }
//
// Every config is serde-serialisable; a copy is written next to
// the checkpoint as run_config.json. validate() is called by the
// controller before the first epoch.

use std::path::PathBuf;

use burn::optim::{
    decay::WeightDecayConfig, AdamConfig, AdamWConfig,
};
use serde::{Deserialize, Serialize};

use crate::data::encoder::MAX_SEQ_LEN;
use crate::error::{PipelineError, PipelineResult};
use crate::ml::loss::DistillationLoss;
use crate::ml::scheduler::PlateauConfig;

// ─── Epoch loop ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    pub epochs:          usize,
    pub batch_size:      usize,
    /// Consecutive non-improving epochs tolerated before stopping early
    pub patience:        usize,
    /// Ceiling on the global gradient L2 norm
    pub max_grad_norm:   f64,
    pub scheduler:       PlateauConfig,
    pub checkpoint_dir:  PathBuf,
    /// File stem of the best-so-far checkpoint inside `checkpoint_dir`
    pub checkpoint_name: String,
    pub num_workers:     usize,
    pub seed:            u64,
    pub max_seq_len:     usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            epochs:          10,
            batch_size:      8,
            patience:        5,
            max_grad_norm:   1.0,
            scheduler:       PlateauConfig::default(),
            checkpoint_dir:  PathBuf::from("checkpoints"),
            checkpoint_name: "best_model".to_string(),
            num_workers:     1,
            seed:            42,
            max_seq_len:     MAX_SEQ_LEN,
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if self.epochs == 0 {
            return Err(PipelineError::config("epochs", "must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::config("batch_size", "must be at least 1"));
        }
        if self.patience == 0 {
            return Err(PipelineError::config("patience", "must be at least 1"));
        }
        if !(self.max_grad_norm.is_finite() && self.max_grad_norm > 0.0) {
            return Err(PipelineError::config(
                "max_grad_norm",
                format!("must be a positive finite number, got {}", self.max_grad_norm),
            ));
        }
        if self.max_seq_len == 0 {
            return Err(PipelineError::config("max_seq_len", "must be at least 1"));
        }
        if self.checkpoint_name.trim().is_empty() {
            return Err(PipelineError::config("checkpoint_name", "must not be empty"));
        }
        self.scheduler.validate()
    }
}

// ─── Optimiser ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Adam,
    AdamW,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub kind:          OptimizerKind,
    pub learning_rate: f64,
    pub weight_decay:  f64,
    pub beta_1:        f32,
    pub beta_2:        f32,
    pub epsilon:       f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            kind:          OptimizerKind::Adam,
            learning_rate: 3e-4,
            weight_decay:  1e-3,
            beta_1:        0.9,
            beta_2:        0.98,
            epsilon:       1e-8,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(PipelineError::config(
                "learning_rate",
                format!("must be a positive finite number, got {}", self.learning_rate),
            ));
        }
        if !(self.weight_decay >= 0.0) {
            return Err(PipelineError::config("weight_decay", "must be non-negative"));
        }
        for (name, beta) in [("beta_1", self.beta_1), ("beta_2", self.beta_2)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(PipelineError::config(name, format!("must lie in [0, 1), got {beta}")));
            }
        }
        if !(self.epsilon > 0.0) {
            return Err(PipelineError::config("epsilon", "must be positive"));
        }
        Ok(())
    }

    /// Adam with L2 weight decay folded into the gradient.
    pub fn adam(&self) -> AdamConfig {
        let cfg = AdamConfig::new()
            .with_beta_1(self.beta_1)
            .with_beta_2(self.beta_2)
            .with_epsilon(self.epsilon);
        if self.weight_decay > 0.0 {
            cfg.with_weight_decay(Some(WeightDecayConfig::new(self.weight_decay as f32)))
        } else {
            cfg
        }
    }

    /// AdamW with decoupled weight decay.
    pub fn adamw(&self) -> AdamWConfig {
        AdamWConfig::new()
            .with_beta_1(self.beta_1)
            .with_beta_2(self.beta_2)
            .with_epsilon(self.epsilon)
            .with_weight_decay(self.weight_decay as f32)
    }
}

// ─── Per-run configs ─────────────────────────────────────────────────────────
/// Fine-tuning a single classifier with plain cross-entropy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinetuneConfig {
    pub run:       LoopConfig,
    pub optimizer: OptimizerConfig,
}

impl FinetuneConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        self.run.validate()?;
        self.optimizer.validate()
    }
}

/// Training a student against a frozen teacher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistillConfig {
    pub run:         LoopConfig,
    pub optimizer:   OptimizerConfig,
    pub temperature: f64,
    pub soft_weight: f64,
    pub hard_weight: f64,
}

impl Default for DistillConfig {
    fn default() -> Self {
        Self {
            run:         LoopConfig::default(),
            optimizer:   OptimizerConfig::default(),
            temperature: 2.0,
            soft_weight: 0.5,
            hard_weight: 0.5,
        }
    }
}

impl DistillConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        self.run.validate()?;
        self.optimizer.validate()?;
        self.loss().map(|_| ())
    }

    pub fn loss(&self) -> PipelineResult<DistillationLoss> {
        DistillationLoss::new(self.temperature, self.soft_weight, self.hard_weight)
    }
}
