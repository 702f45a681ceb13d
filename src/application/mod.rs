// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one user-level goal.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Errors become anyhow::Error with context naming the stage

/// Corpus preparation and architecture settings shared by the use cases
pub mod setup;

/// Fine-tune a classifier (the teacher)
pub mod finetune_use_case;

/// Distil a fine-tuned teacher into a student
pub mod distill_use_case;

/// Score a saved checkpoint on the test split
pub mod evaluate_use_case;
