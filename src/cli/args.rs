//! Command-line argument parsing
//!
//! Provides clap-based CLI with subcommands for indexing and querying.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// policyrag - Query insurance policy documents with a local LLM
#[derive(Parser, Debug)]
#[command(name = "policyrag")]
#[command(version)]
#[command(about = "Index insurance policy documents and answer claim questions", long_about = None)]
pub struct Args {
    /// Ollama model to use
    #[arg(short, long)]
    pub model: Option<String>,

    /// Ollama host
    #[arg(long)]
    pub host: Option<String>,

    /// Ollama port
    #[arg(long)]
    pub port: Option<u16>,

    /// Vector store directory
    #[arg(long)]
    pub store_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk, embed, and index a document into the vector store
    Index {
        /// Document to index (.txt, .md)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Answer a single question against the indexed documents
    Ask {
        /// The question to answer
        #[arg(value_name = "QUESTION")]
        question: String,

        /// Answer against this file's text directly, skipping the store
        #[arg(long)]
        context_file: Option<PathBuf>,

        /// Print the full decision record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Answer a batch of questions (one per line) against a document
    Batch {
        /// File with one question per line
        #[arg(value_name = "QUESTIONS")]
        questions_file: PathBuf,

        /// Answer against this document directly instead of the store
        #[arg(long)]
        document: Option<PathBuf>,
    },

    /// Display current configuration
    Config,
}
