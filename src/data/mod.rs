// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw JSON-lines records to tensor batches:
//
//   JsonlCorpus        → reads train / validation / test records
//       │
//       ▼
//   rebalance          → oversamples minority classes (train, validation)
//       │
//       ▼
//   canonicalize       → swaps raw labels 1 ↔ 2, exactly once
//       │
//       ▼
//   Preprocessor       → cleans whitespace and control characters
//   LexiconSegmenter   → optional word segmentation
//       │
//       ▼
//   SentenceEncoder    → token ids + attention mask, ≤ 256 tokens
//       │
//       ▼
//   SentimentDataset   → implements Burn's Dataset trait
//       │
//       ▼
//   SentimentBatcher   → pads each batch to its own longest sequence
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads corpus splits from JSON-lines files
pub mod loader;

/// Cleans and normalises raw sentences
pub mod preprocessor;

/// Greedy longest-match word segmentation
pub mod segmenter;

/// Random oversampling of minority classes
pub mod rebalance;

/// Shuffles and splits data into train/validation sets
pub mod splitter;

/// Tokenises sentences with a HuggingFace tokenizer
pub mod encoder;

/// Implements Burn's Dataset trait for encoded sentences
pub mod dataset;

/// Implements Burn's Batcher trait with per-batch padding
pub mod batcher;

/// Orchestrates the steps above for all three splits
pub mod pipeline;
