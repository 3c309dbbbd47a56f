//! Text embedding seam
//!
//! The vector index talks to an `Embedder` trait so tests can substitute
//! a deterministic in-process implementation; production uses the local
//! BERT engine in `engine`.

pub mod engine;

pub use engine::LocalEmbedder;

use crate::errors::Result;

/// Converts texts into fixed-dimension vectors.
///
/// Contract: one vector per input text, in input order, all of
/// `dimension()` length. An empty input slice must return an empty vec
/// without touching the underlying model. Output is deterministic for a
/// fixed model and input.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;
}
