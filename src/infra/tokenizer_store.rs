// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Manages the tokenizer kept next to a model checkpoint.
//
//   load()           → read <dir>/tokenizer.json
//   load_or_build()  → load, or build a word-level vocabulary
//                      from the training sentences and save it
//   save()           → write a tokenizer into <dir>
//
// A pretrained subword tokenizer (e.g. the one shipped with a
// HuggingFace checkpoint) can simply be dropped into the
// directory as tokenizer.json before training.
//
// The built vocabulary writes the tokenizer JSON directly,
// with contiguous ids so vocab size == largest id + 1:
//   [PAD]=0 [UNK]=1 [CLS]=2 [SEP]=3 [MASK]=4, words from 5.
//
// Vocabulary words are split the way the `Whitespace`
// pre-tokenizer splits at encode time (\w+|[^\w\s]+), so
// "hay." counts as "hay" and "." and segmented words such as
// "giảng_viên" stay whole.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use tokenizers::Tokenizer;

use crate::error::{PipelineError, PipelineResult};

const TOKENIZER_FILE: &str = "tokenizer.json";
const SPECIAL_TOKENS: [&str; 5] = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]"];

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load existing tokenizer or build a new one from the training sentences
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> PipelineResult<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!("Building new word-level tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    /// Load a previously saved tokenizer
    pub fn load(&self) -> PipelineResult<Tokenizer> {
        load_tokenizer(&self.path())
    }

    /// Write `tokenizer` into this store's directory
    pub fn save(&self, tokenizer: &Tokenizer) -> PipelineResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path();
        tokenizer
            .save(&path, true)
            .map_err(|e| PipelineError::Tokenizer(format!("cannot save '{}': {e}", path.display())))?;
        tracing::debug!("Saved tokenizer to '{}'", path.display());
        Ok(())
    }

    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> PipelineResult<Tokenizer> {
        if vocab_size <= SPECIAL_TOKENS.len() {
            return Err(PipelineError::config(
                "vocab_size",
                format!("must exceed the {} special tokens", SPECIAL_TOKENS.len()),
            ));
        }
        fs::create_dir_all(&self.dir)?;

        // ── Step 1: word frequencies ─────────────────────────────────────────
        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for piece in pre_tokenize(&text.to_lowercase()) {
                *freq.entry(piece).or_insert(0) += 1;
            }
        }

        // Most frequent first, ties broken alphabetically for a stable vocabulary
        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size - SPECIAL_TOKENS.len());

        // ── Step 2: vocab JSON ───────────────────────────────────────────────
        let mut vocab = serde_json::Map::new();
        for (id, tok) in SPECIAL_TOKENS.iter().enumerate() {
            vocab.insert(tok.to_string(), serde_json::json!(id));
        }
        for (word, _) in &words {
            let next_id = vocab.len();
            vocab.entry(word.clone()).or_insert(serde_json::json!(next_id));
        }
        let total = vocab.len();

        let added_tokens: Vec<serde_json::Value> = SPECIAL_TOKENS
            .iter()
            .enumerate()
            .map(|(id, tok)| serde_json::json!({
                "id": id, "content": tok, "single_word": false, "lstrip": false,
                "rstrip": false, "normalized": false, "special": true
            }))
            .collect();

        // ── Step 3: tokenizer JSON in HuggingFace format ─────────────────────
        // [CLS] sentence [SEP], so position 0 can be pooled for classification
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": false,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": {
                "type": "TemplateProcessing",
                "single": [
                    { "SpecialToken": { "id": "[CLS]", "type_id": 0 } },
                    { "Sequence":     { "id": "A",     "type_id": 0 } },
                    { "SpecialToken": { "id": "[SEP]", "type_id": 0 } }
                ],
                "pair": [
                    { "SpecialToken": { "id": "[CLS]", "type_id": 0 } },
                    { "Sequence":     { "id": "A",     "type_id": 0 } },
                    { "SpecialToken": { "id": "[SEP]", "type_id": 0 } },
                    { "Sequence":     { "id": "B",     "type_id": 1 } },
                    { "SpecialToken": { "id": "[SEP]", "type_id": 1 } }
                ],
                "special_tokens": {
                    "[CLS]": { "id": "[CLS]", "ids": [2], "tokens": ["[CLS]"] },
                    "[SEP]": { "id": "[SEP]", "ids": [3], "tokens": ["[SEP]"] }
                }
            },
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let path = self.path();
        fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)?;
        tracing::info!("Tokenizer built with {} entries, saved to '{}'", total, path.display());

        self.load()
    }
}

/// Runs of word characters and runs of punctuation, whitespace dropped.
fn pre_tokenize(text: &str) -> Vec<String> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut pieces  = Vec::new();
    let mut current = String::new();
    let mut in_word = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            continue;
        }
        if !current.is_empty() && is_word(c) != in_word {
            pieces.push(std::mem::take(&mut current));
        }
        in_word = is_word(c);
        current.push(c);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Load a tokenizer from an explicit `tokenizer.json` path.
pub fn load_tokenizer(path: &Path) -> PipelineResult<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| PipelineError::Tokenizer(format!("cannot load '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        vec![
            "giảng_viên dạy rất hay".to_string(),
            "phòng học rất nóng".to_string(),
            "rất hay".to_string(),
        ]
    }

    #[test]
    fn test_builds_contiguous_vocab_with_special_tokens() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let tok   = store.load_or_build(&corpus(), 100).unwrap();

        assert!(store.path().exists());
        assert_eq!(tok.token_to_id("[PAD]"), Some(0));
        assert_eq!(tok.token_to_id("[CLS]"), Some(2));
        // "rất" is the most frequent word
        assert_eq!(tok.token_to_id("rất"), Some(5));
        // 5 special + 7 distinct words
        assert_eq!(tok.get_vocab_size(true), 12);
    }

    #[test]
    fn test_encoding_wraps_with_cls_and_sep() {
        let dir = tempfile::tempdir().unwrap();
        let tok = TokenizerStore::new(dir.path()).load_or_build(&corpus(), 100).unwrap();

        let enc = tok.encode("rất hay", true).unwrap();
        let ids = enc.get_ids();
        assert_eq!(ids.first(), Some(&2));
        assert_eq!(ids.last(),  Some(&3));
        assert_eq!(ids.len(), 4);

        let unknown = tok.encode("xyz", true).unwrap();
        assert_eq!(unknown.get_ids(), &[2, 1, 3]);
    }

    #[test]
    fn test_trailing_punctuation_keeps_words_known() {
        let dir = tempfile::tempdir().unwrap();
        let texts = vec!["giảng_viên dạy rất hay.".to_string(), "phòng học nóng, quá!".to_string()];
        let tok = TokenizerStore::new(dir.path()).load_or_build(&texts, 100).unwrap();

        let enc    = tok.encode("giảng_viên dạy rất hay.", true).unwrap();
        let tokens = enc.get_tokens();
        assert_eq!(tokens, &["[CLS]", "giảng_viên", "dạy", "rất", "hay", ".", "[SEP]"]);
        assert!(!enc.get_ids().contains(&1), "no word of a training sentence is [UNK]");

        let enc = tok.encode("phòng học nóng, quá!", true).unwrap();
        assert!(!enc.get_ids().contains(&1));
    }

    #[test]
    fn test_pre_tokenize_splits_words_from_punctuation() {
        assert_eq!(pre_tokenize("rất hay."), vec!["rất", "hay", "."]);
        assert_eq!(pre_tokenize("nóng,quá  !!"), vec!["nóng", ",", "quá", "!!"]);
        assert_eq!(pre_tokenize("giảng_viên"), vec!["giảng_viên"]);
        assert!(pre_tokenize("   ").is_empty());
    }

    #[test]
    fn test_second_call_loads_saved_file() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let first = store.load_or_build(&corpus(), 100).unwrap();
        // Different corpus, but the saved tokenizer wins
        let again = store.load_or_build(&["khác".to_string()], 100).unwrap();
        assert_eq!(first.get_vocab_size(true), again.get_vocab_size(true));
    }

    #[test]
    fn test_rejects_tiny_vocab() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TokenizerStore::new(dir.path()).load_or_build(&corpus(), 3).is_err());
    }
}
