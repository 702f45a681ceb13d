// ============================================================
// Layer 5 — Classifier Adapter
// ============================================================
// One capability over every backbone family the system can
// train or distil:
//
//   ClassifierAdapter<B>  → forward(ids, mask) → logits [batch, 3]
//                           trainable, parameters owned by burn's Module
//   FrozenTeacher<B>      → the same forward, but the weights live on the
//                           inner (non-autodiff) backend, so its logits
//                           can never take part in a backward pass
//   ModelSpec             → serialisable description used to rebuild a
//                           model before loading a checkpoint into it
//
// The training loop holds a ClassifierAdapter and never matches
// on the variant.

use burn::{
    module::AutodiffModule,
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ml::model::{
    PooledClassifier, PooledClassifierConfig,
    TransformerClassifier, TransformerClassifierConfig,
};

#[derive(Module, Debug)]
pub enum ClassifierAdapter<B: Backend> {
    Transformer(TransformerClassifier<B>),
    Pooled(PooledClassifier<B>),
}

impl<B: Backend> ClassifierAdapter<B> {
    /// input_ids, attention_mask: [batch, seq_len] → logits: [batch, 3]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        match self {
            ClassifierAdapter::Transformer(m) => m.forward(input_ids, attention_mask),
            ClassifierAdapter::Pooled(m)      => m.forward(input_ids, attention_mask),
        }
    }

    /// Adapters handed to the optimiser are always trainable.
    pub fn trainable(&self) -> bool {
        true
    }
}

// ─── ModelSpec ────────────────────────────────────────────────────────────────
/// Architecture of a classifier, stored next to every checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Transformer(TransformerClassifierConfig),
    Pooled(PooledClassifierConfig),
}

impl ModelSpec {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ClassifierAdapter<B> {
        match self {
            ModelSpec::Transformer(cfg) => ClassifierAdapter::Transformer(cfg.init(device)),
            ModelSpec::Pooled(cfg)      => ClassifierAdapter::Pooled(cfg.init(device)),
        }
    }

    /// Seed the backend from `rng`, then build fresh weights.
    pub fn init_seeded<B: Backend, R: Rng + ?Sized>(&self, device: &B::Device, rng: &mut R) -> ClassifierAdapter<B> {
        B::seed(rng.gen::<u64>());
        self.init(device)
    }

    pub fn vocab_size(&self) -> usize {
        match self {
            ModelSpec::Transformer(cfg) => cfg.vocab_size,
            ModelSpec::Pooled(cfg)      => cfg.vocab_size,
        }
    }

    /// Longest sequence the model accepts, if it has a hard limit.
    pub fn max_seq_len(&self) -> Option<usize> {
        match self {
            ModelSpec::Transformer(cfg) => Some(cfg.max_seq_len),
            ModelSpec::Pooled(_)        => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModelSpec::Transformer(_) => "transformer",
            ModelSpec::Pooled(_)      => "pooled",
        }
    }
}

// ─── FrozenTeacher ────────────────────────────────────────────────────────────
/// A read-only classifier used as the source of soft labels.
pub struct FrozenTeacher<B: AutodiffBackend> {
    model: ClassifierAdapter<B::InnerBackend>,
}

impl<B: AutodiffBackend> FrozenTeacher<B> {
    pub fn new(model: ClassifierAdapter<B::InnerBackend>) -> Self {
        Self { model }
    }

    /// Freeze a model that was built (or fine-tuned) on the autodiff backend.
    pub fn from_trained(model: ClassifierAdapter<B>) -> Self {
        Self { model: model.valid() }
    }

    pub fn trainable(&self) -> bool {
        false
    }

    /// Teacher logits as a constant of the autodiff graph.
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let logits = self.model.forward(input_ids.inner(), attention_mask.inner());
        Tensor::from_inner(logits)
    }

    /// Teacher logits for validation/test batches, already on the inner backend.
    pub fn forward_inner(
        &self,
        input_ids:      Tensor<B::InnerBackend, 2, Int>,
        attention_mask: Tensor<B::InnerBackend, 2, Int>,
    ) -> Tensor<B::InnerBackend, 2> {
        self.model.forward(input_ids, attention_mask)
    }
}
