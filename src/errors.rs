//! Error types for the PolicyRAG pipeline
//!
//! Index, parsing, and provider failures are structured variants so the
//! answer orchestrator can convert them into degraded decision records
//! instead of propagating them to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the RAG pipeline
#[derive(Error, Debug)]
pub enum RagError {
    /// Search called before any add/load succeeded
    #[error("Vector index not loaded or built yet")]
    IndexNotReady,

    /// A persisted artifact of the index pair is missing
    #[error("Vector store artifact not found: {}", path.display())]
    StoreNotFound { path: PathBuf },

    /// Restored vector and chunk artifacts disagree on entry count
    #[error("Vector store mismatch: {vectors} vectors vs {chunks} chunks")]
    StoreMismatch { vectors: usize, chunks: usize },

    /// Embedding dimension differs from the dimension fixed at first insert
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Embedding model errors
    #[error("Embedding model error: {0}")]
    Model(#[from] candle_core::Error),

    /// Tokenizer or embedding pipeline errors
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// LLM provider API errors
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// JSON parsing errors past all recovery tiers
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Unsupported input document format
    #[error("Unsupported document format: {0}")]
    UnsupportedDocument(String),

    /// Batch call with no questions
    #[error("Question list is empty")]
    EmptyQuestionList,

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Vector artifact codec errors
    #[error("Store codec error: {0}")]
    StoreCodec(#[from] bincode::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;

/// Convert anyhow errors to RagError
impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Generic(err.to_string())
    }
}
