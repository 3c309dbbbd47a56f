//! policyrag - Insurance policy question answering over local models
//!
//! A retrieval-augmented pipeline for insurance policy documents:
//! chunking, local BERT embeddings, an exact nearest-neighbor vector
//! index, regex query structuring, dual-query retrieval, and
//! fault-tolerant parsing of the LLM's two-part decision response.

pub mod errors;
pub mod types;
pub mod chunking;
pub mod embedding;
pub mod index;
pub mod query;
pub mod retrieval;
pub mod prompt;
pub mod response;
pub mod llm;
pub mod answer;
pub mod loaders;
pub mod config;
pub mod cli;

// Re-export commonly used types
pub use errors::{RagError, Result};
pub use types::{Chunk, DecisionResult};
