//! movierag CLI - ask questions about a movie corpus
//!
//! # Commands
//!
//! ```bash
//! # Populate field vectors for a raw corpus
//! movierag vectorize --input movies.json --output movies.vectorized.json
//!
//! # One-shot question
//! movierag ask --corpus movies.vectorized.json "space adventures with heroes"
//!
//! # Interactive prompt loop
//! movierag chat --corpus movies.vectorized.json --top-k 5
//! ```
//!
//! Model access is configured with `OPENAI_API_KEY` and, for compatible
//! endpoints, `OPENAI_BASE_URL`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use movierag::openai::{
    DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL, OPENAI_API_BASE, OpenAIConfig,
    OpenAIEmbeddingProvider, OpenAIGenerator,
};
use movierag::{Answer, Corpus, InMemoryCorpus, RagConfig, RagPipeline, Vectorizer};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "movierag")]
#[command(about = "Answer questions about movies with retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    model: ModelArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ModelArgs {
    /// API key for the OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_BASE_URL", default_value = OPENAI_API_BASE, global = true)]
    base_url: String,

    /// Embedding model name
    #[arg(long, env = "MOVIERAG_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL, global = true)]
    embedding_model: String,

    /// Chat model name
    #[arg(long, env = "MOVIERAG_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL, global = true)]
    chat_model: String,

    /// Embedding dimensions; required for models other than OpenAI's
    /// text-embedding family and must match the vectorized corpus
    #[arg(long, env = "MOVIERAG_DIMENSIONS", global = true)]
    dimensions: Option<usize>,
}

#[derive(Args)]
struct QueryArgs {
    /// JSON corpus with field vectors
    #[arg(short, long)]
    corpus: PathBuf,

    /// Number of movies retrieved per question
    #[arg(short = 'k', long, default_value = "3")]
    top_k: usize,

    /// Field vector used for scoring
    #[arg(long, default_value = movierag::document::DESCRIPTION_VECTOR)]
    field: String,

    /// Seconds allowed for each model call
    #[arg(long, default_value = "60")]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask {
        #[command(flatten)]
        query: QueryArgs,

        /// The question to answer
        question: String,
    },

    /// Ask questions interactively until `exit` or Ctrl-D
    Chat {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Embed the text fields of a corpus and write the result
    Vectorize {
        /// JSON corpus to read
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the vectorized corpus
        #[arg(short, long)]
        output: PathBuf,
    },
}

impl ModelArgs {
    fn openai_config(&self) -> Result<OpenAIConfig> {
        let api_key = self
            .api_key
            .clone()
            .context("an API key is required (set OPENAI_API_KEY or pass --api-key)")?;
        let mut config = OpenAIConfig::new(api_key)
            .with_base_url(&self.base_url)
            .with_embedding_model(&self.embedding_model)
            .with_chat_model(&self.chat_model);
        if let Some(dims) = self.dimensions {
            config = config.with_embedding_dimensions(dims);
        }
        Ok(config)
    }
}

async fn build_pipeline(model: &ModelArgs, query: &QueryArgs) -> Result<RagPipeline> {
    let openai = model.openai_config()?;
    let corpus = InMemoryCorpus::load_json(&query.corpus).await?;
    info!(documents = corpus.len().await?, "corpus ready");

    let timeout = Duration::from_secs(query.timeout);
    let config = RagConfig::builder()
        .top_k(query.top_k)
        .primary_field(&query.field)
        .embed_timeout(timeout)
        .generate_timeout(timeout)
        .build()?;

    Ok(RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(OpenAIEmbeddingProvider::new(openai.clone())?))
        .corpus(Arc::new(corpus))
        .generator(Arc::new(OpenAIGenerator::new(openai)?))
        .build()?)
}

fn print_answer(answer: &Answer) {
    println!("{}\n", answer.text);
    if answer.sources.is_empty() {
        println!("(no matching movies in the corpus)");
        return;
    }
    println!("Sources:");
    for (i, source) in answer.sources.iter().enumerate() {
        println!("  {}. {} (score: {:.4})", i + 1, source.title, source.score);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ask { query, question } => {
            let pipeline = build_pipeline(&cli.model, &query).await?;
            let answer = pipeline.run(&question, query.top_k).await?;
            print_answer(&answer);
        }

        Commands::Chat { query } => {
            let pipeline = build_pipeline(&cli.model, &query).await?;
            let mut editor = DefaultEditor::new()?;
            println!("Ask about the movies in {} (type 'exit' to quit)", query.corpus.display());

            loop {
                let line = match editor.readline("movie> ") {
                    Ok(line) => line,
                    Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                    Err(e) => return Err(e.into()),
                };
                let question = line.trim();
                if question.is_empty() {
                    continue;
                }
                if matches!(question, "exit" | "quit") {
                    break;
                }
                editor.add_history_entry(question)?;

                match pipeline.run(question, query.top_k).await {
                    Ok(answer) => print_answer(&answer),
                    Err(e) => eprintln!("[{}] {e}", e.kind()),
                }
                println!();
            }
        }

        Commands::Vectorize { input, output } => {
            let embedder = Arc::new(OpenAIEmbeddingProvider::new(cli.model.openai_config()?)?);
            let corpus = InMemoryCorpus::load_json(&input).await?;
            let mut documents = corpus.all_documents().await?;

            println!("Vectorizing {} movies from '{}'...", documents.len(), input.display());
            Vectorizer::new(embedder).vectorize(&mut documents).await?;

            InMemoryCorpus::from_documents(documents).save_json(&output).await?;
            println!("Wrote '{}'", output.display());
        }
    }

    Ok(())
}
