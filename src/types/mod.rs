//! Core value types shared across the pipeline
//!
//! Chunks are the unit of indexed document text; `DecisionResult` is the
//! structured answer record every query resolves to, regardless of how far
//! the pipeline got before degrading.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::query::StructuredQuery;

/// Provenance metadata attached to a chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Originating document name (e.g. "policy.pdf", "email/attachment")
    pub source: String,
    /// 1-based page number when the loader knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// A bounded unit of document text with provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(content: impl Into<String>, source: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            content: content.into(),
            metadata: ChunkMetadata {
                source: source.into(),
                page,
            },
        }
    }
}

/// Claim decision emitted by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approved,
    Rejected,
    Partial,
    Information,
}

impl Decision {
    /// Lenient mapping from model output; unknown labels fall back to
    /// `Information` rather than failing the parse.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "approved" => Decision::Approved,
            "rejected" => Decision::Rejected,
            "partial" => Decision::Partial,
            _ => Decision::Information,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "Approved",
            Decision::Rejected => "Rejected",
            Decision::Partial => "Partial",
            Decision::Information => "Information",
        }
    }
}

/// Model confidence in its decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "high" => Confidence::High,
            "low" => Confidence::Low,
            _ => Confidence::Medium,
        }
    }
}

/// Page reference inside a justification; models emit either a number
/// or a label like "N/A"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageRef {
    Number(u64),
    Label(String),
}

/// A policy clause cited in support of the decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Justification {
    #[serde(default)]
    pub clause: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageRef>,
    #[serde(default)]
    pub relevance: String,
}

/// How many chunks fed the prompt, or the direct-context marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunksUsed {
    Count(usize),
    DirectContext,
}

impl Serialize for ChunksUsed {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ChunksUsed::Count(n) => serializer.serialize_u64(*n as u64),
            ChunksUsed::DirectContext => serializer.serialize_str("direct_context"),
        }
    }
}

impl<'de> Deserialize<'de> for ChunksUsed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_u64()
                .map(|n| ChunksUsed::Count(n as usize))
                .ok_or_else(|| D::Error::custom("negative chunk count")),
            Value::String(s) if s == "direct_context" => Ok(ChunksUsed::DirectContext),
            other => Err(D::Error::custom(format!(
                "invalid chunks_used value: {}",
                other
            ))),
        }
    }
}

/// Query-processing metadata attached to every answered question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub structured_query: StructuredQuery,
    pub enhanced_search: bool,
    pub chunks_used: ChunksUsed,
}

/// The final structured answer record
///
/// Always returned, never mutated after return. Degraded paths (parse
/// failure, provider failure, index unavailable) still produce one of
/// these, with `decision = Information` and the failure described in
/// `summary` / `_parsing_error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub direct_answer: String,
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    pub confidence: Confidence,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub justification: Vec<Justification>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_requirements: Vec<String>,
    #[serde(
        rename = "_metadata",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub metadata: Option<QueryMetadata>,
    #[serde(
        rename = "_parsing_error",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub parsing_error: Option<String>,
    #[serde(
        rename = "_raw_preview",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub raw_preview: Option<String>,
}

impl DecisionResult {
    /// Build a result from a parsed (possibly partial) model JSON object,
    /// injecting the direct answer extracted before the `JSON:` marker.
    ///
    /// Field extraction is lenient: missing or mistyped fields take
    /// defaults instead of failing, since the repair tiers may hand us a
    /// truncated object.
    pub fn from_llm_value(value: &Value, direct_answer: String) -> Self {
        let decision = value
            .get("decision")
            .and_then(Value::as_str)
            .map(Decision::from_label)
            .unwrap_or(Decision::Information);

        let amount = match value.get("amount") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        let confidence = value
            .get("confidence")
            .and_then(Value::as_str)
            .map(Confidence::from_label)
            .unwrap_or(Confidence::Medium);

        let summary = value
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let justification = value
            .get("justification")
            .cloned()
            .map(|v| serde_json::from_value(v).unwrap_or_default())
            .unwrap_or_default();

        let additional_requirements = value
            .get("additional_requirements")
            .cloned()
            .map(|v| serde_json::from_value(v).unwrap_or_default())
            .unwrap_or_default();

        Self {
            direct_answer,
            decision,
            amount,
            confidence,
            summary,
            justification,
            additional_requirements,
            metadata: None,
            parsing_error: None,
            raw_preview: None,
        }
    }
}
