//! LLM providers

pub mod client;

pub use client::{GenerationRequest, LlmProvider, OllamaGenerator};
