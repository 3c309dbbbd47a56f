//! Dual-query retrieval with prefix deduplication

pub mod engine;

pub use engine::{RetrievalConfig, Retriever};
