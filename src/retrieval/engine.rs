//! Retrieval engine over the vector index
//!
//! Runs the enhanced query and the original question as two separate
//! searches. The enhanced query raises recall when few structured fields
//! are extractable; the original query guards against the enhancement
//! drowning out the user's own wording. Duplicate semantic content across
//! the two result sets is collapsed by content prefix.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::Result;
use crate::index::VectorIndex;
use crate::query::{enhance_search_query, StructuredQuery};
use crate::types::Chunk;

/// Retrieval parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Results requested for the enhanced query
    pub enhanced_top_k: usize,
    /// Results requested for the original question
    pub original_top_k: usize,
    /// Final candidate cap after merging
    pub max_chunks: usize,
    /// Identity-key length for deduplication, in characters
    pub dedup_prefix_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enhanced_top_k: 8,
            original_top_k: 5,
            max_chunks: 10,
            dedup_prefix_chars: 100,
        }
    }
}

/// Dual-query retriever
pub struct Retriever {
    config: RetrievalConfig,
}

impl Retriever {
    /// Create a retriever with default parameters
    pub fn new() -> Self {
        Self {
            config: RetrievalConfig::default(),
        }
    }

    /// Create with custom parameters
    pub fn with_config(config: RetrievalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Retrieve candidate chunks for a question.
    ///
    /// Searches with the enhanced query first, then the original question;
    /// concatenates enhanced-first, deduplicates on the first
    /// `dedup_prefix_chars` characters of content, and truncates to
    /// `max_chunks` in concatenation order.
    pub fn retrieve(
        &self,
        index: &VectorIndex,
        question: &str,
        structured: &StructuredQuery,
    ) -> Result<Vec<Chunk>> {
        let enhanced = enhance_search_query(structured);

        let mut combined = index.search(&enhanced, self.config.enhanced_top_k)?;
        combined.extend(index.search(question, self.config.original_top_k)?);

        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for chunk in combined {
            // Character (not byte) prefix: chunk text may hold multi-byte
            // currency and language symbols
            let key: String = chunk
                .content
                .chars()
                .take(self.config.dedup_prefix_chars)
                .collect();
            if seen.insert(key) {
                unique.push(chunk);
            }
        }

        unique.truncate(self.config.max_chunks);
        Ok(unique)
    }
}

impl Default for Retriever {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::query::parse_query_structure;
    use std::sync::Arc;

    struct HashEmbedder;

    impl Embedder for HashEmbedder {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|text| {
                    let mut vector = vec![0.0f32; 16];
                    for token in text.split_whitespace() {
                        let mut hash = 5381usize;
                        for byte in token.to_lowercase().bytes() {
                            hash = hash.wrapping_mul(33).wrapping_add(byte as usize);
                        }
                        vector[hash % 16] += 1.0;
                    }
                    vector
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            16
        }
    }

    fn build_index(contents: &[&str]) -> VectorIndex {
        let chunks: Vec<Chunk> = contents
            .iter()
            .enumerate()
            .map(|(i, c)| Chunk::new(*c, "policy.pdf", Some(i as u32 + 1)))
            .collect();
        let mut index = VectorIndex::new(Arc::new(HashEmbedder));
        index.add(&chunks).unwrap();
        index
    }

    #[test]
    fn test_results_are_bounded() {
        let contents: Vec<String> = (0..30)
            .map(|i| format!("Clause {} covers a distinct benefit category entirely.", i))
            .collect();
        let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
        let index = build_index(&refs);

        let question = "46M knee surgery in Pune";
        let structured = parse_query_structure(question);
        let retriever = Retriever::new();
        let results = retriever.retrieve(&index, question, &structured).unwrap();
        assert!(results.len() <= retriever.config().max_chunks);
    }

    #[test]
    fn test_no_duplicate_prefixes_in_results() {
        let index = build_index(&[
            "Knee surgery is covered after the waiting period elapses.",
            "Cardiac care is covered for in-network hospitals only.",
            "Dental work is excluded from the base plan.",
        ]);

        let question = "Is knee surgery covered?";
        let structured = parse_query_structure(question);
        let retriever = Retriever::new();
        let results = retriever.retrieve(&index, question, &structured).unwrap();

        let mut prefixes = HashSet::new();
        for chunk in &results {
            let key: String = chunk.content.chars().take(100).collect();
            assert!(prefixes.insert(key), "duplicate 100-char prefix in results");
        }
    }

    #[test]
    fn test_shared_prefix_collapses() {
        // Two distinct chunks sharing a 100-char prefix collapse to one
        let boilerplate = "This clause is part of the standard policy wording issued by the insurer for the current plan year and all endorsements attached thereto";
        let a = format!("{} - knee surgery is covered.", boilerplate);
        let b = format!("{} - knee surgery is excluded.", boilerplate);
        let index = build_index(&[&a, &b, "Unrelated dental clause."]);

        let question = "knee surgery";
        let structured = parse_query_structure(question);
        let results = Retriever::new()
            .retrieve(&index, question, &structured)
            .unwrap();

        let with_boilerplate = results
            .iter()
            .filter(|c| c.content.starts_with(boilerplate))
            .count();
        assert_eq!(with_boilerplate, 1);
    }

    #[test]
    fn test_small_config_truncates() {
        let index = build_index(&[
            "First clause about coverage.",
            "Second clause about claims.",
            "Third clause about exclusions.",
        ]);
        let retriever = Retriever::with_config(RetrievalConfig {
            enhanced_top_k: 3,
            original_top_k: 3,
            max_chunks: 2,
            dedup_prefix_chars: 100,
        });

        let question = "coverage";
        let structured = parse_query_structure(question);
        let results = retriever.retrieve(&index, question, &structured).unwrap();
        assert_eq!(results.len(), 2);
    }
}
