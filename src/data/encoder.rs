// ============================================================
// Layer 4 — Sentence Encoder
// ============================================================
// Wraps a HuggingFace tokenizer and turns one cleaned (and
// optionally segmented) sentence into token ids plus an
// attention mask, truncated to the maximum sequence length.
//
// Truncation is done by the tokenizer itself, so the special
// tokens of its template ([CLS] ... [SEP]) survive on long
// sentences and only content tokens are dropped.
//
// Padding is NOT applied here: each batch is padded to its own
// longest sequence by the SentimentBatcher.

use tokenizers::{PostProcessor, Tokenizer, TruncationParams};

use crate::error::{PipelineError, PipelineResult};

/// Maximum number of tokens kept per sentence.
pub const MAX_SEQ_LEN: usize = 256;

pub struct SentenceEncoder {
    tokenizer: Tokenizer,
    pad_id:    u32,
}

impl SentenceEncoder {
    pub fn new(mut tokenizer: Tokenizer, max_len: usize) -> PipelineResult<Self> {
        if max_len == 0 {
            return Err(PipelineError::config("max_seq_len", "must be at least 1"));
        }

        let pad_id = tokenizer
            .get_padding()
            .map(|p| p.pad_id)
            .or_else(|| tokenizer.token_to_id("[PAD]"))
            .or_else(|| tokenizer.token_to_id("<pad>"))
            .unwrap_or(0);

        let specials = tokenizer.get_post_processor().map_or(0, |p| p.added_tokens(false));
        if max_len <= specials {
            return Err(PipelineError::config(
                "max_seq_len",
                format!("{max_len} leaves no room next to {specials} special tokens"),
            ));
        }

        // Batch-level padding happens in the batcher
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams { max_length: max_len, ..Default::default() }))
            .map_err(|e| PipelineError::Tokenizer(e.to_string()))?;

        Ok(Self { tokenizer, pad_id })
    }

    pub fn pad_id(&self) -> u32 {
        self.pad_id
    }

    /// Vocabulary size including added tokens.
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    /// Encode one sentence → (token ids, attention mask).
    pub fn encode(&self, text: &str) -> PipelineResult<(Vec<u32>, Vec<u32>)> {
        let enc = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| PipelineError::Tokenizer(e.to_string()))?;

        let mut ids  = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();

        // An empty sentence still needs one position for the model to pool
        if ids.is_empty() {
            ids.push(self.pad_id);
            mask.push(0);
        }

        Ok((ids, mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::TokenizerStore;

    fn tokenizer(dir: &std::path::Path) -> Tokenizer {
        let texts = vec!["rất hay rất tốt".to_string(), "phòng học nóng".to_string()];
        TokenizerStore::new(dir).load_or_build(&texts, 64).unwrap()
    }

    #[test]
    fn test_long_sentence_keeps_closing_token() {
        let dir = tempfile::tempdir().unwrap();
        let tok = tokenizer(dir.path());
        let sep = tok.token_to_id("[SEP]").unwrap();
        let enc = SentenceEncoder::new(tok, 5).unwrap();

        let (ids, mask) = enc.encode("rất hay rất tốt phòng học nóng rất hay").unwrap();
        assert_eq!(ids.len(), 5);
        assert_eq!(mask.len(), 5);
        assert_eq!(ids.first(), Some(&2));
        assert_eq!(ids.last(), Some(&sep));
    }

    #[test]
    fn test_short_sentence_is_not_padded() {
        let dir = tempfile::tempdir().unwrap();
        let enc = SentenceEncoder::new(tokenizer(dir.path()), 16).unwrap();
        let (ids, _) = enc.encode("rất hay").unwrap();
        assert_eq!(ids.len(), 4);
        assert_eq!(enc.pad_id(), 0);
    }

    #[test]
    fn test_limit_must_leave_room_for_special_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let err = SentenceEncoder::new(tokenizer(dir.path()), 2).err().unwrap();
        assert!(matches!(err, PipelineError::Configuration { .. }));
    }
}
