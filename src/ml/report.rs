//! What a training run hands back to its caller (and writes to `results.json`).

use serde::{Deserialize, Serialize};

use crate::infra::checkpoint::CheckpointMeta;
use crate::ml::metrics::ClassificationMetrics;
use crate::ml::state::StopReason;

/// Loss and metrics of one pass (train or validation) over one epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    /// The objective actually minimised: cross-entropy when fine-tuning,
    /// the blended soft/hard loss when distilling.
    pub loss: f64,
    /// Hard-label cross-entropy, reported separately during distillation.
    pub hard_loss: Option<f64>,
    pub metrics: ClassificationMetrics,
    pub learning_rate: f64,
}

/// A checkpoint that could not be written or read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointFailure {
    pub epoch:  usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// `ModelSpec::label()` of the trained model
    pub model:               String,
    pub train_history:       Vec<EpochRecord>,
    pub val_history:         Vec<EpochRecord>,
    pub test_loss:           f64,
    pub test_metrics:        ClassificationMetrics,
    pub stop_reason:         StopReason,
    /// Metadata of the last checkpoint that was written successfully
    pub best_checkpoint:     Option<CheckpointMeta>,
    pub checkpoint_failures: Vec<CheckpointFailure>,
}

impl TrainingReport {
    pub fn epochs_run(&self) -> usize {
        self.train_history.len()
    }
}

/// Result of scoring a saved model on one split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub loss:    f64,
    pub metrics: ClassificationMetrics,
}
