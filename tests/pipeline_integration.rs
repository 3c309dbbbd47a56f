//! End-to-end pipeline tests with an in-process embedder and a scripted
//! LLM provider

use async_trait::async_trait;
use std::sync::Arc;
use tempfile::TempDir;

use policyrag::answer::AnswerEngine;
use policyrag::chunking::Chunker;
use policyrag::embedding::Embedder;
use policyrag::errors::Result;
use policyrag::index::VectorIndex;
use policyrag::llm::{GenerationRequest, LlmProvider};
use policyrag::types::{Chunk, ChunksUsed, Decision};

/// Deterministic token-hash embedder; similar wording lands close
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

/// Echoes a canned two-part response; records nothing
struct ScriptedLlm {
    response: &'static str,
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
        Ok(self.response.to_string())
    }
}

const POLICY_TEXT: &str = "Knee surgery is covered after a waiting period of 24 months from policy inception.\n\n\
Cardiac procedures are covered at network hospitals subject to pre-authorization.\n\n\
Dental treatment is excluded unless arising from an accident.\n\n\
Hospitalization expenses include room rent up to 1% of the sum insured per day.";

const REJECTED_RESPONSE: &str = "ANSWER: No, the waiting period has not elapsed.\nJSON:\n{\n  \"decision\": \"Rejected\",\n  \"confidence\": \"High\",\n  \"summary\": \"Knee surgery carries a 24-month waiting period; the policy is 3 months old.\",\n  \"justification\": [\n    {\"clause\": \"waiting period of 24 months\", \"source\": \"policy.txt\", \"page\": 1, \"relevance\": \"Applies directly to knee surgery\"}\n  ]\n}";

fn indexed_policy() -> VectorIndex {
    let chunks: Vec<Chunk> = Chunker::with_max_words(12)
        .chunk(POLICY_TEXT)
        .into_iter()
        .map(|content| Chunk::new(content, "policy.txt", None))
        .collect();
    assert!(chunks.len() > 1, "test document should span several chunks");

    let mut index = VectorIndex::new(Arc::new(HashEmbedder));
    index.add(&chunks).unwrap();
    index
}

#[tokio::test]
async fn chunk_index_answer_end_to_end() {
    let index = indexed_policy();
    let engine = AnswerEngine::new(Arc::new(ScriptedLlm {
        response: REJECTED_RESPONSE,
    }));

    let result = engine
        .answer(&index, "46M knee surgery in Pune, 3-month policy")
        .await;

    assert_eq!(result.decision, Decision::Rejected);
    assert_eq!(result.direct_answer, "No, the waiting period has not elapsed.");
    assert_eq!(result.justification.len(), 1);

    let metadata = result.metadata.expect("metadata attached");
    assert!(metadata.enhanced_search);
    assert_eq!(metadata.structured_query.age, Some(46));
    assert!(metadata
        .structured_query
        .procedure
        .contains(&"knee".to_string()));
    assert!(matches!(metadata.chunks_used, ChunksUsed::Count(n) if n > 0));
}

#[tokio::test]
async fn save_load_roundtrip_preserves_search() {
    let index = indexed_policy();
    let dir = TempDir::new().unwrap();
    index.save(dir.path()).unwrap();

    let mut restored = VectorIndex::new(Arc::new(HashEmbedder));
    restored.load(dir.path()).unwrap();
    assert_eq!(restored.len(), index.len());

    let query = "knee surgery waiting period";
    let before = index.search(query, 3).unwrap();
    let after = restored.search(query, 3).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn batch_direct_mode_answers_every_question() {
    let chunks: Vec<Chunk> = Chunker::with_max_words(12)
        .chunk(POLICY_TEXT)
        .into_iter()
        .map(|content| Chunk::new(content, "policy.txt", None))
        .collect();

    let engine = AnswerEngine::new(Arc::new(ScriptedLlm {
        response: REJECTED_RESPONSE,
    }));
    let questions = vec![
        "Is knee surgery covered?".to_string(),
        "What is the room rent limit?".to_string(),
    ];

    let results = engine.answer_batch_direct(&chunks, &questions).await.unwrap();
    assert_eq!(results.len(), 2);
    for result in &results {
        assert_eq!(
            result.metadata.as_ref().unwrap().chunks_used,
            ChunksUsed::DirectContext
        );
    }
}

#[tokio::test]
async fn decision_record_serializes_with_private_fields() {
    let index = indexed_policy();
    let engine = AnswerEngine::new(Arc::new(ScriptedLlm {
        response: REJECTED_RESPONSE,
    }));

    let result = engine.answer(&index, "Is knee surgery covered?").await;
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["decision"], "Rejected");
    assert!(json["_metadata"]["enhanced_search"].as_bool().unwrap());
    assert!(json.get("_parsing_error").is_none());
}
