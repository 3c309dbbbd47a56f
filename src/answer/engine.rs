//! Answer engine: sequences structuring, retrieval, prompting,
//! generation, and parsing
//!
//! The contract at this boundary is "always return a result object":
//! index errors and provider faults degrade into low-confidence
//! `Information` records instead of propagating, so a batch of
//! questions never aborts on a single failure. Only input errors
//! (an empty question list) are surfaced to the caller.

use std::sync::Arc;

use crate::errors::{RagError, Result};
use crate::index::VectorIndex;
use crate::llm::{GenerationRequest, LlmProvider};
use crate::prompt::{PromptBuilder, PromptMode};
use crate::query::parse_query_structure;
use crate::response::ResponseParser;
use crate::retrieval::Retriever;
use crate::types::{Chunk, ChunksUsed, Confidence, Decision, DecisionResult, QueryMetadata};

/// Generation and direct-context parameters
#[derive(Debug, Clone)]
pub struct AnswerConfig {
    pub temperature: f32,
    pub max_tokens: usize,
    pub system: Option<String>,
    /// Chunks taken from the front of a document in direct batch mode
    pub direct_max_chunks: usize,
    /// Character cap on the assembled direct context
    pub direct_max_chars: usize,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 2048,
            system: None,
            direct_max_chunks: 15,
            direct_max_chars: 15_000,
        }
    }
}

/// Orchestrates one full answer cycle per question
pub struct AnswerEngine {
    llm: Arc<dyn LlmProvider>,
    retriever: Retriever,
    parser: ResponseParser,
    config: AnswerConfig,
}

impl AnswerEngine {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self::with_config(llm, Retriever::new(), AnswerConfig::default())
    }

    pub fn with_config(llm: Arc<dyn LlmProvider>, retriever: Retriever, config: AnswerConfig) -> Self {
        Self {
            llm,
            retriever,
            parser: ResponseParser::new(),
            config,
        }
    }

    /// Vector-store mode: retrieve candidate chunks for the question and
    /// answer against them. Index and provider failures degrade into the
    /// returned record.
    pub async fn answer(&self, index: &VectorIndex, question: &str) -> DecisionResult {
        let structured = parse_query_structure(question);

        let chunks = match self.retriever.retrieve(index, question, &structured) {
            Ok(chunks) => chunks,
            Err(e) => {
                let mut result = degraded_result(
                    "An error occurred while processing your query.",
                    format!("Vector store search failed: {}", e),
                );
                result.metadata = Some(QueryMetadata {
                    structured_query: structured,
                    enhanced_search: true,
                    chunks_used: ChunksUsed::Count(0),
                });
                return result;
            }
        };

        let chunks_used = ChunksUsed::Count(chunks.len());
        let prompt = PromptBuilder::build(question, &structured, &PromptMode::Retrieved(chunks));

        let mut result = self.generate_and_parse(&prompt).await;
        result.metadata = Some(QueryMetadata {
            structured_query: structured,
            enhanced_search: true,
            chunks_used,
        });
        result
    }

    /// Direct-context mode: answer against caller-supplied literal text,
    /// skipping retrieval entirely.
    pub async fn answer_direct(&self, question: &str, context: &str) -> DecisionResult {
        let structured = parse_query_structure(question);
        let prompt = PromptBuilder::build(
            question,
            &structured,
            &PromptMode::DirectContext(context.to_string()),
        );

        let mut result = self.generate_and_parse(&prompt).await;
        result.metadata = Some(QueryMetadata {
            structured_query: structured,
            enhanced_search: false,
            chunks_used: ChunksUsed::DirectContext,
        });
        result
    }

    /// Answer a batch of questions against the index, sequentially and
    /// per-question isolated: one degraded answer never aborts the rest.
    pub async fn answer_batch(
        &self,
        index: &VectorIndex,
        questions: &[String],
    ) -> Result<Vec<DecisionResult>> {
        if questions.is_empty() {
            return Err(RagError::EmptyQuestionList);
        }

        let mut results = Vec::with_capacity(questions.len());
        for question in questions {
            results.push(self.answer(index, question).await);
        }
        Ok(results)
    }

    /// Answer a batch against a capped direct-context assembly of a
    /// document's leading chunks, skipping the vector store.
    pub async fn answer_batch_direct(
        &self,
        chunks: &[Chunk],
        questions: &[String],
    ) -> Result<Vec<DecisionResult>> {
        if questions.is_empty() {
            return Err(RagError::EmptyQuestionList);
        }

        let context = self.assemble_direct_context(chunks);
        let mut results = Vec::with_capacity(questions.len());
        for question in questions {
            results.push(self.answer_direct(question, &context).await);
        }
        Ok(results)
    }

    /// Join the leading chunks into one context block, capped by chunk
    /// count and then by character count
    fn assemble_direct_context(&self, chunks: &[Chunk]) -> String {
        let joined = chunks
            .iter()
            .take(self.config.direct_max_chunks)
            .map(|chunk| {
                let page = chunk
                    .metadata
                    .page
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "?".to_string());
                format!(
                    "Source: {}, Page: {}\nContent:\n{}",
                    chunk.metadata.source, page, chunk.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");

        // Char-boundary truncation; chunk text may hold multi-byte symbols
        if joined.chars().count() > self.config.direct_max_chars {
            joined.chars().take(self.config.direct_max_chars).collect()
        } else {
            joined
        }
    }

    async fn generate_and_parse(&self, prompt: &str) -> DecisionResult {
        let request = GenerationRequest {
            prompt: prompt.to_string(),
            system: self.config.system.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        match self.llm.generate(&request).await {
            Ok(raw) => self.parser.parse(&raw),
            Err(e) => degraded_result(
                "Unable to process the query at this time.",
                format!("LLM provider call failed: {}", e),
            ),
        }
    }
}

/// Low-confidence record for faults caught at the orchestrator boundary
fn degraded_result(direct_answer: &str, summary: String) -> DecisionResult {
    DecisionResult {
        direct_answer: direct_answer.to_string(),
        decision: Decision::Information,
        amount: None,
        confidence: Confidence::Low,
        summary,
        justification: Vec::new(),
        additional_requirements: Vec::new(),
        metadata: None,
        parsing_error: None,
        raw_preview: None,
    }
}
