// ============================================================
// Layer 4 — Sentence Preprocessor
// ============================================================
// Normalises a raw feedback sentence before segmentation and
// tokenisation:
//   1. Map Unicode whitespace variants and control characters to spaces
//   2. Collapse runs of spaces
//   3. Trim both ends
//
// Sentences are classified as a single line, so newlines are
// folded into spaces as well.

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean a raw sentence. Returns an owned, single-line String.
    pub fn clean(&self, text: &str) -> String {
        let mut out        = String::with_capacity(text.len());
        let mut last_space = true;

        for c in text.chars() {
            let c = match c {
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_whitespace() || c.is_control() => ' ',
                c => c,
            };

            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        out.trim_end().to_string()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
