// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Persistence that several layers share:
//
//   checkpoint.rs      — best-so-far model weights (CompactRecorder)
//                        with their architecture and metrics as
//                        JSON, plus run_config.json and results.json
//
//   tokenizer_store.rs — tokenizer.json next to the checkpoint, so
//                        training, distillation and evaluation all
//                        see the same token ids
//
//   metrics.rs         — metrics.csv, one row per epoch and phase
//
// Reference: Burn Book §5 (Checkpointing)

/// Best-model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;
