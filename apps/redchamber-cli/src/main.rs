use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use redchamber_core::answer::{format_context, AnswerOutcome, GenerationError};
use redchamber_core::config::{Config, RagSettings};
use redchamber_core::traits::AnswerGenerator;
use redchamber_core::types::{AskResponse, RankedSource};
use redchamber_engine::{BuildProgress, RagEngine};
use redchamber_vector::{CacheState, IndexCache, SnapshotKey};

const EXIT_WORDS: &[&str] = &["quit", "exit", "q", "退出"];
const NO_RESULTS: &str = "No passage in the corpus is relevant to this question.";

#[derive(Parser)]
#[command(name = "redchamber", version, about = "Retrieval over a plain-text literary corpus")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Corpus directory (overrides data.corpus_dir)
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Cache directory (overrides data.cache_dir)
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the index, or restore it when the cache is fresh
    Index {
        /// Rebuild even if the cache is fresh
        #[arg(long)]
        force: bool,
    },
    /// Show the best matching chunks for a query
    Query {
        query: String,
        #[command(flatten)]
        retrieval: RetrievalArgs,
    },
    /// Retrieve sources for a question and print the context handed to the model
    Ask {
        question: String,
        #[command(flatten)]
        retrieval: RetrievalArgs,
        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask questions interactively until quit, exit, q or 退出
    Chat {
        #[command(flatten)]
        retrieval: RetrievalArgs,
    },
    /// Report cache contents and freshness
    Status,
    /// Delete the cached index
    ClearCache,
}

#[derive(Args, Clone, Copy)]
struct RetrievalArgs {
    /// Maximum number of passages (defaults to retrieval.top_k)
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Similarity a passage must exceed (defaults to retrieval.min_similarity)
    #[arg(long)]
    min_similarity: Option<f32>,
}

impl RetrievalArgs {
    fn resolve(self, settings: &RagSettings) -> anyhow::Result<(usize, f32)> {
        let min_similarity = self.min_similarity.unwrap_or(settings.retrieval.min_similarity);
        anyhow::ensure!(
            min_similarity.is_finite() && min_similarity >= 0.0,
            "--min-similarity {min_similarity} must be a finite value >= 0"
        );
        Ok((self.top_k.unwrap_or(settings.retrieval.top_k), min_similarity))
    }
}

/// Stands in for the language model: the "answer" is the prompt it would get.
struct PromptPreview;

impl AnswerGenerator for PromptPreview {
    fn generate(&self, question: &str, sources: &[RankedSource]) -> Result<String, GenerationError> {
        Ok(format!("Question: {question}\n\n{}", format_context(sources)))
    }
}

struct BarProgress {
    bar: Option<ProgressBar>,
}

impl BuildProgress for BarProgress {
    fn start(&mut self, documents: usize) {
        let bar = ProgressBar::new(documents as u64);
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}") {
            bar.set_style(style.progress_chars("#>-"));
        }
        self.bar = Some(bar);
    }

    fn document(&mut self, name: &str, chunks: usize) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("{name} ({chunks} chunks)"));
            bar.inc(1);
        }
    }

    fn finish(&mut self, chunks: usize) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message(format!("{chunks} chunks"));
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = Config::load().context("loading configuration")?.settings()?;
    if let Some(corpus) = &cli.corpus {
        settings.data.corpus_dir = corpus.to_string_lossy().to_string();
    }
    if let Some(cache) = &cli.cache {
        settings.data.cache_dir = cache.to_string_lossy().to_string();
    }

    match cli.command {
        Command::Index { force } => index(settings, force),
        Command::Query { query, retrieval } => {
            let engine = open(settings)?;
            let (top_k, min_similarity) = retrieval.resolve(engine.settings())?;
            let hits = engine.search(&query, top_k, min_similarity);
            if hits.is_empty() {
                println!("{NO_RESULTS}");
            }
            let preview_chars = engine.settings().retrieval.preview_chars;
            for (i, hit) in hits.into_iter().enumerate() {
                let source = RankedSource::from(hit);
                println!("{}. [{:.3}] {} #{}", i + 1, source.similarity, source.source, source.chunk_index);
                println!("   {}", source.preview(preview_chars));
            }
            Ok(())
        }
        Command::Ask { question, retrieval, json } => {
            let engine = open(settings)?;
            let (top_k, min_similarity) = retrieval.resolve(engine.settings())?;
            if json {
                let response = engine.ask(&question, top_k, min_similarity);
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                answer(&engine, &question, top_k, min_similarity);
            }
            Ok(())
        }
        Command::Chat { retrieval } => {
            let engine = open(settings)?;
            let (top_k, min_similarity) = retrieval.resolve(engine.settings())?;
            chat(&engine, top_k, min_similarity)
        }
        Command::Status => status(settings),
        Command::ClearCache => {
            let cache = IndexCache::new(settings.data.cache_path());
            if cache.clear()? {
                println!("Removed cached index from {}", cache.dir().display());
            } else {
                println!("No cached index in {}", cache.dir().display());
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "redchamber=debug" } else { "redchamber=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn open(settings: RagSettings) -> anyhow::Result<RagEngine> {
    let mut progress = BarProgress { bar: None };
    RagEngine::open_with(settings, &mut progress).context("opening the index")
}

fn index(settings: RagSettings, force: bool) -> anyhow::Result<()> {
    if force {
        info!(target: "redchamber::cli", "forced rebuild requested");
        IndexCache::new(settings.data.cache_path()).clear()?;
    }
    let engine = open(settings)?;
    let snapshot = engine.snapshot();
    println!(
        "Index ready: {} chunks from {} files, {} terms (built {})",
        snapshot.len(),
        snapshot.key().fingerprint.files.len(),
        snapshot.vocabulary().len(),
        snapshot.built_at().format("%Y-%m-%d %H:%M:%S UTC"),
    );
    Ok(())
}

fn answer(engine: &RagEngine, question: &str, top_k: usize, min_similarity: f32) {
    let report = engine.answer_with(&PromptPreview, question, top_k, min_similarity);
    match &report.outcome {
        AnswerOutcome::Answered(text) => println!("{text}"),
        AnswerOutcome::NoRelevantContent => println!("{NO_RESULTS}"),
        AnswerOutcome::Failed(e) => println!("Answer generation failed: {e}"),
    }
    print_sources(&report.response, engine.settings().retrieval.preview_chars);
}

fn print_sources(response: &AskResponse, preview_chars: usize) {
    if response.sources.is_empty() {
        return;
    }
    println!("\nSources:");
    for (i, source) in response.sources.iter().enumerate() {
        println!("{}. {} (similarity {:.3})", i + 1, source.source, source.similarity);
        println!("   {}", source.preview(preview_chars));
    }
}

fn chat(engine: &RagEngine, top_k: usize, min_similarity: f32) -> anyhow::Result<()> {
    println!("Ask a question; /reload picks up corpus changes, /rebuild starts over, quit, exit, q or 退出 leaves.");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let question = line?;
        let question = question.trim();
        if is_exit_command(question) {
            break;
        }
        match question {
            "" => continue,
            "/reload" => {
                let changed = engine.refresh_with(&mut BarProgress { bar: None })?;
                println!("{}", if changed { "Index reloaded." } else { "Index is up to date." });
                continue;
            }
            "/rebuild" => {
                engine.rebuild_with(&mut BarProgress { bar: None })?;
                println!("Index rebuilt: {} chunks.", engine.snapshot().len());
                continue;
            }
            _ => {}
        }
        answer(engine, question, top_k, min_similarity);
        println!("\n{}\n", "=".repeat(50));
    }
    println!("Bye.");
    Ok(())
}

fn is_exit_command(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    EXIT_WORDS.contains(&input.as_str())
}

fn status(settings: RagSettings) -> anyhow::Result<()> {
    // Opening the engine would rebuild a stale cache; inspect it directly instead.
    let key = RagEngine::expected_key_for(&settings)?;
    let cache = IndexCache::new(settings.data.cache_path());
    write_status(&mut io::stdout().lock(), &cache, &key)?;
    Ok(())
}

fn write_status(out: &mut impl Write, cache: &IndexCache, key: &SnapshotKey) -> io::Result<()> {
    match cache.describe() {
        Ok(None) => writeln!(out, "No cached index in {}", cache.dir().display())?,
        Ok(Some(d)) => {
            writeln!(out, "Cache:       {}", d.dir.display())?;
            writeln!(out, "Built at:    {}", d.built_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
            writeln!(out, "Chunks:      {}", d.chunks)?;
            writeln!(out, "Vocabulary:  {}", d.vocabulary)?;
            writeln!(out, "Files:       {} ({} bytes)", d.files, d.corpus_bytes)?;
        }
        Err(e) => writeln!(out, "Cache:       {} ({e})", cache.dir().display())?,
    }
    let label = match cache.state(key) {
        CacheState::Fresh => "fresh",
        CacheState::Missing => "missing",
        CacheState::CorpusChanged => "stale (corpus changed)",
        CacheState::ParamsChanged => "stale (settings changed)",
        CacheState::Unreadable => "unreadable",
    };
    writeln!(out, "State:       {label}")
}
