//! policyrag - Main CLI entry point

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;

use policyrag::answer::{AnswerConfig, AnswerEngine};
use policyrag::cli::{Args, Commands};
use policyrag::config::Config;
use policyrag::embedding::LocalEmbedder;
use policyrag::errors::RagError;
use policyrag::index::VectorIndex;
use policyrag::llm::OllamaGenerator;
use policyrag::loaders::loader_for;
use policyrag::retrieval::Retriever;
use policyrag::types::DecisionResult;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.clone())?;
    if let Some(model) = &args.model {
        config.ollama.model = model.clone();
    }
    if let Some(host) = &args.host {
        config.ollama.host = host.clone();
    }
    if let Some(port) = args.port {
        config.ollama.port = port;
    }

    let store_dir = args
        .store_dir
        .clone()
        .unwrap_or_else(|| config.paths.store_path());

    match &args.command {
        Commands::Index { file } => run_index(&config, &store_dir, file).await,
        Commands::Ask {
            question,
            context_file,
            json,
        } => run_ask(&config, &store_dir, question, context_file.as_deref(), *json).await,
        Commands::Batch {
            questions_file,
            document,
        } => run_batch(&config, &store_dir, questions_file, document.as_deref()).await,
        Commands::Config => run_config(&config),
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

async fn run_index(config: &Config, store_dir: &Path, file: &Path) -> Result<()> {
    let loader = loader_for(file)?;
    let chunks = loader.load(file)?;
    if chunks.is_empty() {
        println!("{}", "Document produced no chunks; nothing to index.".yellow());
        return Ok(());
    }
    println!(
        "{} {} chunk(s) from {}",
        "Loaded".green(),
        chunks.len(),
        file.display()
    );

    let pb = spinner("Loading embedding model...");
    let embedder = Arc::new(LocalEmbedder::new()?);
    let mut index = VectorIndex::new(embedder);

    // Extend an existing store rather than replacing it
    if store_dir.join(policyrag::index::VECTORS_FILE).exists() {
        index.load(store_dir)?;
        pb.set_message(format!("Extending existing store ({} chunks)", index.len()));
    }

    pb.set_message(format!("Embedding {} chunk(s)...", chunks.len()));
    index.add(&chunks)?;
    pb.finish_and_clear();

    index.save(store_dir)?;
    println!(
        "{} {} chunk(s) indexed into {}",
        "Done:".green().bold(),
        index.len(),
        store_dir.display()
    );
    Ok(())
}

fn build_engine(config: &Config) -> Result<AnswerEngine> {
    let generator = OllamaGenerator::with_base_url(config.ollama.base_url(), &config.ollama.model)?;
    let answer_config = AnswerConfig {
        temperature: config.generation.temperature,
        max_tokens: config.generation.max_tokens,
        ..AnswerConfig::default()
    };
    Ok(AnswerEngine::with_config(
        Arc::new(generator),
        Retriever::with_config(config.retrieval.clone()),
        answer_config,
    ))
}

fn load_index(store_dir: &Path) -> Result<VectorIndex> {
    let embedder = Arc::new(LocalEmbedder::new()?);
    let mut index = VectorIndex::new(embedder);
    index.load(store_dir)?;
    Ok(index)
}

async fn run_ask(
    config: &Config,
    store_dir: &Path,
    question: &str,
    context_file: Option<&Path>,
    json: bool,
) -> Result<()> {
    let engine = build_engine(config)?;

    let result = match context_file {
        Some(path) => {
            let context = std::fs::read_to_string(path)?;
            engine.answer_direct(question, &context).await
        }
        None => {
            let index = load_index(store_dir)?;
            engine.answer(&index, question).await
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(question, &result);
    }
    Ok(())
}

async fn run_batch(
    config: &Config,
    store_dir: &Path,
    questions_file: &Path,
    document: Option<&Path>,
) -> Result<()> {
    let questions: Vec<String> = std::fs::read_to_string(questions_file)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if questions.is_empty() {
        return Err(RagError::EmptyQuestionList.into());
    }

    let engine = build_engine(config)?;

    let results = match document {
        Some(path) => {
            let loader = loader_for(path)?;
            let chunks = loader.load(path)?;
            engine.answer_batch_direct(&chunks, &questions).await?
        }
        None => {
            let index = load_index(store_dir)?;
            engine.answer_batch(&index, &questions).await?
        }
    };

    for (question, result) in questions.iter().zip(&results) {
        print_result(question, result);
        println!();
    }
    Ok(())
}

fn run_config(config: &Config) -> Result<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn print_result(question: &str, result: &DecisionResult) {
    println!("{} {}", "Q:".bold(), question);
    println!("{} {}", "A:".bold(), result.direct_answer);
    println!(
        "   {} {}  {} {:?}",
        "Decision:".cyan(),
        result.decision.as_str(),
        "Confidence:".cyan(),
        result.confidence
    );
    if let Some(amount) = &result.amount {
        println!("   {} {}", "Amount:".cyan(), amount);
    }
    if !result.summary.is_empty() {
        println!("   {}", result.summary);
    }
    for justification in &result.justification {
        println!(
            "   {} {} ({})",
            "-".dimmed(),
            justification.clause,
            justification.source
        );
    }
    if let Some(error) = &result.parsing_error {
        println!("   {} {}", "Warning:".yellow(), error);
    }
}
