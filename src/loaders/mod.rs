//! Document loaders
//!
//! Loaders turn a file into ordered `Chunk`s ready for indexing. Only
//! plain-text formats are handled here; binary formats (PDF, DOCX) are
//! out of scope and rejected up front.

use std::path::Path;

use crate::chunking::Chunker;
use crate::errors::{RagError, Result};
use crate::types::Chunk;

/// Turns one document into ordered chunks with provenance
pub trait DocumentLoader: std::fmt::Debug {
    fn load(&self, path: &Path) -> Result<Vec<Chunk>>;
}

/// Loader for plain-text documents (.txt, .md, .text)
#[derive(Debug)]
pub struct TextLoader {
    chunker: Chunker,
}

impl TextLoader {
    pub fn new() -> Self {
        Self {
            chunker: Chunker::new(),
        }
    }

    pub fn with_chunker(chunker: Chunker) -> Self {
        Self { chunker }
    }
}

impl Default for TextLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLoader for TextLoader {
    fn load(&self, path: &Path) -> Result<Vec<Chunk>> {
        let text = std::fs::read_to_string(path)?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        // Plain text carries no page boundaries
        Ok(self
            .chunker
            .chunk(&text)
            .into_iter()
            .map(|content| Chunk::new(content, source.clone(), None))
            .collect())
    }
}

/// Pick a loader by file extension; unsupported formats are an input
/// error, not a degraded answer
pub fn loader_for(path: &Path) -> Result<Box<dyn DocumentLoader>> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "txt" | "md" | "text" => Ok(Box::new(TextLoader::new())),
        other => Err(RagError::UnsupportedDocument(format!(
            ".{} ({})",
            other,
            path.display()
        ))),
    }
}
