//! Document chunking under a word budget
//!
//! Splits raw text on blank lines and sentence boundaries, then greedily
//! packs the resulting sections into chunks of at most `max_words` words.
//! A single section longer than the budget is emitted whole: breaking
//! mid-sentence loses more retrieval quality than one oversized chunk.

use once_cell::sync::Lazy;
use regex::Regex;

/// Default word budget per chunk
pub const DEFAULT_MAX_WORDS: usize = 15_000;

static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Greedy word-budget chunker
#[derive(Debug, Clone)]
pub struct Chunker {
    max_words: usize,
}

impl Chunker {
    /// Create a chunker with the default word budget
    pub fn new() -> Self {
        Self::with_max_words(DEFAULT_MAX_WORDS)
    }

    /// Create a chunker with a custom word budget
    pub fn with_max_words(max_words: usize) -> Self {
        Self { max_words }
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Split `text` into chunks of at most `max_words` words each.
    ///
    /// Sections are accumulated in order; when adding the next section
    /// would exceed the budget, the buffer is flushed and the section
    /// starts a new one. Empty input yields no chunks.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut word_count = 0usize;

        for section in split_sections(text) {
            let words: Vec<&str> = section.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }

            if !current.is_empty() && word_count + words.len() > self.max_words {
                chunks.push(current.join(" "));
                word_count = words.len();
                current = words;
            } else {
                word_count += words.len();
                current.extend(words);
            }
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new()
    }
}

/// Split text into candidate sections at blank lines and after
/// sentence-ending periods followed by whitespace.
fn split_sections(text: &str) -> Vec<&str> {
    let mut sections = Vec::new();

    for block in BLANK_LINES.split(text) {
        let bytes = block.as_bytes();
        let mut start = 0;
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] == b'.' && i + 1 < bytes.len() && bytes[i + 1].is_ascii_whitespace() {
                sections.push(&block[start..=i]);
                let mut j = i + 1;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                start = j;
                i = j;
            } else {
                i += 1;
            }
        }

        if start < block.len() {
            sections.push(&block[start..]);
        }
    }

    sections
}
