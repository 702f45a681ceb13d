// ============================================================
// Layer 4 — Sentiment Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<EncodedExample>
// into tensors.
//
// Sequences arrive unpadded. Each batch is padded to the length
// of ITS OWN longest sequence (never the global maximum):
//
//   lengths in batch: [5, 9, 3]      → tensors of shape [3, 9]
//   input_ids row 0:  t t t t t P P P P     (P = pad id)
//   mask row 0:       1 1 1 1 1 0 0 0 0
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::EncodedExample;

// ─── SentimentBatch ───────────────────────────────────────────────────────────
/// A batch ready for the classifier forward pass.
#[derive(Debug, Clone)]
pub struct SentimentBatch<B: Backend> {
    /// Token ids — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// Attention mask — shape: [batch_size, seq_len]
    /// 1 = real token, 0 = padding
    pub attention_mask: Tensor<B, 2, Int>,

    /// Canonical class labels — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,

    /// The same labels on the host, for metric accumulation
    pub targets: Vec<usize>,
}

// ─── SentimentBatcher ─────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct SentimentBatcher<B: Backend> {
    device:  B::Device,
    pad_id:  u32,
    max_len: usize,
}

impl<B: Backend> SentimentBatcher<B> {
    pub fn new(device: B::Device, pad_id: u32, max_len: usize) -> Self {
        Self { device, pad_id, max_len }
    }
}

impl<B: Backend> Batcher<EncodedExample, SentimentBatch<B>> for SentimentBatcher<B> {
    fn batch(&self, items: Vec<EncodedExample>) -> SentimentBatch<B> {
        let batch_size = items.len();
        let seq_len = items
            .iter()
            .map(EncodedExample::len)
            .max()
            .unwrap_or(1)
            .clamp(1, self.max_len);

        let mut ids_flat  = Vec::with_capacity(batch_size * seq_len);
        let mut mask_flat = Vec::with_capacity(batch_size * seq_len);

        for item in &items {
            let n = item.len().min(seq_len);
            ids_flat.extend(item.input_ids[..n].iter().map(|&x| x as i32));
            mask_flat.extend(item.attention_mask[..n].iter().map(|&x| x as i32));
            // right-pad to the batch length
            ids_flat.extend(std::iter::repeat(self.pad_id as i32).take(seq_len - n));
            mask_flat.extend(std::iter::repeat(0).take(seq_len - n));
        }

        let targets: Vec<usize> = items.iter().map(|e| e.label.index()).collect();
        let label_ints: Vec<i32> = targets.iter().map(|&t| t as i32).collect();

        let input_ids = Tensor::<B, 1, Int>::from_ints(ids_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let attention_mask = Tensor::<B, 1, Int>::from_ints(mask_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let labels = Tensor::<B, 1, Int>::from_ints(label_ints.as_slice(), &self.device);

        SentimentBatch { input_ids, attention_mask, labels, targets }
    }
}
