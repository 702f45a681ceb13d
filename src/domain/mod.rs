// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that define the core
// concepts of the system. No burn types, no file I/O.

/// Raw and canonical labelled sentences, the label swap
pub mod example;

/// Abstractions over the corpus and the word segmenter
pub mod traits;
