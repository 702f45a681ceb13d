// ============================================================
// Error Taxonomy
// ============================================================
// Every fallible operation in the library returns PipelineError.
// The application and CLI layers wrap it in anyhow with context.
//
//   DataError           → bad corpus, fails before training starts
//   NumericInstability  → non-finite loss, aborts the run
//   Configuration       → invalid hyperparameters, checked up front
//   CheckpointIo        → persistence failure, reported to the caller

use std::fmt;

use thiserror::Error;

/// The stage of a run in which an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Stage {
    Configuration,
    DataPrep,
    Training,
    Validation,
    Checkpointing,
    Evaluation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Configuration => "configuration",
            Stage::DataPrep      => "data preparation",
            Stage::Training      => "training",
            Stage::Validation    => "validation",
            Stage::Checkpointing => "checkpointing",
            Stage::Evaluation    => "evaluation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("split '{split}' is empty")]
    EmptySplit { split: String },

    #[error("split '{split}', example {index}: label {label} is outside {{0, 1, 2}}")]
    InvalidLabel { split: String, index: usize, label: i64 },

    #[error("split '{split}' has no examples of class {class}; cannot oversample it")]
    MissingClass { split: String, class: usize },

    #[error("{source_name}:{line}: {reason}")]
    Malformed { source_name: String, line: usize, reason: String },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("non-finite loss ({value}) during {stage} at epoch {epoch}, batch {batch}")]
    NumericInstability { stage: Stage, epoch: usize, batch: usize, value: f64 },

    #[error("invalid configuration: {field}: {reason}")]
    Configuration { field: String, reason: String },

    #[error("checkpoint I/O failed for '{path}': {reason}")]
    CheckpointIo { path: String, reason: String },

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::Configuration { field: field.into(), reason: reason.into() }
    }

    /// The stage this error belongs to, for caller-facing reports.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Configuration { .. } => Stage::Configuration,
            PipelineError::Data(_) | PipelineError::Tokenizer(_) => Stage::DataPrep,
            PipelineError::NumericInstability { stage, .. } => *stage,
            PipelineError::CheckpointIo { .. } => Stage::Checkpointing,
            PipelineError::Io(_) | PipelineError::Json(_) => Stage::DataPrep,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_instability_reports_location() {
        let err = PipelineError::NumericInstability {
            stage: Stage::Training, epoch: 3, batch: 17, value: f64::NAN,
        };
        let msg = err.to_string();
        assert!(msg.contains("epoch 3"));
        assert!(msg.contains("batch 17"));
        assert_eq!(err.stage(), Stage::Training);
    }

    #[test]
    fn test_data_error_converts() {
        let err: PipelineError = DataError::EmptySplit { split: "train".into() }.into();
        assert_eq!(err.stage(), Stage::DataPrep);
        assert!(err.to_string().contains("'train' is empty"));
    }

    #[test]
    fn test_configuration_error_has_its_own_stage() {
        let err = PipelineError::config("temperature", "must be positive");
        assert_eq!(err.stage(), Stage::Configuration);
        assert_eq!(err.stage().to_string(), "configuration");
    }
}
