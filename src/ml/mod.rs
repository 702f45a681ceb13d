// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model, loss and training-loop code lives here.
//
//   model.rs      — the two classifier families
//                   • TransformerClassifier: padding-masked
//                     encoder blocks, first-token pooling
//                   • PooledClassifier: masked mean of token
//                     embeddings → GELU MLP
//   adapter.rs    — ClassifierAdapter enum over both families,
//                   FrozenTeacher, serialisable ModelSpec
//   loss.rs       — cross-entropy and DistillationLoss
//   clip.rs       — global gradient-norm clipping
//   scheduler.rs  — reduce-on-plateau learning rate
//   metrics.rs    — accuracy, macro P/R/F1, confusion matrix
//   state.rs      — per-epoch stop / checkpoint state machine
//   config.rs     — FinetuneConfig, DistillConfig
//   report.rs     — histories and test results of a run
//   controller.rs — run_finetune, run_distillation, evaluate
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Hinton et al. (2015) Distilling the Knowledge in a Neural Network

/// Classifier architectures
pub mod model;

/// One forward capability over every architecture
pub mod adapter;

/// Cross-entropy and distillation objectives
pub mod loss;

/// Global gradient-norm clipping
pub mod clip;

/// Plateau learning-rate scheduler
pub mod scheduler;

/// Classification metrics
pub mod metrics;

/// Early-stopping state machine
pub mod state;

/// Run configuration
pub mod config;

/// Training and evaluation results
pub mod report;

/// The epoch loop
pub mod controller;

/// Backend the models compute on.
#[cfg(feature = "wgpu")]
pub type ComputeBackend = burn::backend::Wgpu;
#[cfg(not(feature = "wgpu"))]
pub type ComputeBackend = burn::backend::NdArray;

/// Backend used for training (gradients enabled).
pub type TrainBackend = burn::backend::Autodiff<ComputeBackend>;

pub type ComputeDevice = <ComputeBackend as burn::prelude::Backend>::Device;
