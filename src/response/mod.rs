//! LLM response parsing and JSON repair

pub mod parser;

pub use parser::ResponseParser;
