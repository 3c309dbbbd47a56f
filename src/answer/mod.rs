//! Answer orchestration

pub mod engine;

pub use engine::{AnswerConfig, AnswerEngine};
