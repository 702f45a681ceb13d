// ============================================================
// Layer 4 — Lexicon Word Segmenter
// ============================================================
// Vietnamese writes one syllable per whitespace-separated token,
// so a word like "giảng viên" (lecturer) spans two tokens.
// Word-segmented corpora join such syllables with underscores:
//
//   "giảng viên dạy rất nhiệt tình"
//        → "giảng_viên dạy rất nhiệt_tình"
//
// LexiconSegmenter does greedy longest-match against a list of
// known multi-syllable words, matching case-insensitively and
// keeping the original casing in the output.

use std::{
    collections::HashSet,
    fs,
    path::Path,
};

use crate::domain::traits::WordSegmenter;
use crate::error::PipelineResult;

pub struct LexiconSegmenter {
    /// Lower-cased words, syllables joined by a single space
    words: HashSet<String>,
    /// Longest word in the lexicon, in syllables
    max_syllables: usize,
}

impl LexiconSegmenter {
    /// Build from an iterator of words. Syllables may be separated
    /// by spaces or underscores; single-syllable entries are ignored.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set           = HashSet::new();
        let mut max_syllables = 1;

        for word in words {
            let syllables: Vec<String> = word
                .as_ref()
                .split(|c: char| c == '_' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_lowercase())
                .collect();
            if syllables.len() < 2 {
                continue;
            }
            max_syllables = max_syllables.max(syllables.len());
            set.insert(syllables.join(" "));
        }

        Self { words: set, max_syllables }
    }

    /// Load a lexicon file with one word per line. Lines starting with '#' are comments.
    pub fn from_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path    = path.as_ref();
        let content = fs::read_to_string(path)?;
        let words   = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));
        let segmenter = Self::new(words);
        tracing::info!(
            "Loaded {} lexicon words from '{}'",
            segmenter.len(),
            path.display()
        );
        Ok(segmenter)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl WordSegmenter for LexiconSegmenter {
    fn segment(&self, text: &str) -> String {
        let syllables: Vec<&str>   = text.split_whitespace().collect();
        let lowered:   Vec<String> = syllables.iter().map(|s| s.to_lowercase()).collect();

        let mut out = Vec::with_capacity(syllables.len());
        let mut i   = 0;

        while i < syllables.len() {
            let longest = self.max_syllables.min(syllables.len() - i);
            let matched = (2..=longest)
                .rev()
                .find(|&n| self.words.contains(&lowered[i..i + n].join(" ")));

            match matched {
                Some(n) => {
                    out.push(syllables[i..i + n].join("_"));
                    i += n;
                }
                None => {
                    out.push(syllables[i].to_string());
                    i += 1;
                }
            }
        }

        out.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter() -> LexiconSegmenter {
        LexiconSegmenter::new(["giảng viên", "nhiệt_tình", "đại học", "đại học quốc gia", "hay"])
    }

    #[test]
    fn test_joins_known_words() {
        let s = segmenter();
        assert_eq!(
            s.segment("giảng viên dạy rất nhiệt tình"),
            "giảng_viên dạy rất nhiệt_tình"
        );
    }

    #[test]
    fn test_prefers_longest_match() {
        let s = segmenter();
        assert_eq!(s.segment("trường đại học quốc gia"), "trường đại_học_quốc_gia");
        assert_eq!(s.segment("trường đại học"), "trường đại_học");
    }

    #[test]
    fn test_case_insensitive_keeps_casing() {
        let s = segmenter();
        assert_eq!(s.segment("Giảng Viên tốt"), "Giảng_Viên tốt");
    }

    #[test]
    fn test_single_syllable_entries_ignored() {
        let s = segmenter();
        assert_eq!(s.len(), 4);
        assert_eq!(s.segment("hay"), "hay");
        assert_eq!(s.segment(""), "");
    }
}
