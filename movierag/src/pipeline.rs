//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] answers one question per call by composing an
//! [`EmbeddingProvider`], a [`Corpus`], and a [`Generator`]:
//!
//! ```text
//! Embedding -> Ranking -> ContextBuilding -> Generating -> Done
//!     \            \             \               \
//!      +------------+-------------+---------------+--> Failed
//! ```
//!
//! An empty ranking is not a failure: the generator is still called, with an
//! empty context, so the model can say nothing relevant was found.
//!
//! # Example
//!
//! ```rust,ignore
//! use movierag::{InMemoryCorpus, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .corpus(Arc::new(InMemoryCorpus::load_json("movies.json").await?))
//!     .generator(Arc::new(my_generator))
//!     .build()?;
//!
//! let answer = pipeline.answer("space adventures with heroes").await?;
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::context::{ContextBlock, ContextBuilder, cap_text_fields};
use crate::corpus::Corpus;
use crate::document::Source;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{Generator, compose_user_prompt};
use crate::ranker::rank;

/// A step of one pipeline invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    Embedding,
    Ranking,
    ContextBuilding,
    Generating,
    Done,
    Failed,
}

impl PipelineStage {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Embedding => "embedding",
            Self::Ranking => "ranking",
            Self::ContextBuilding => "context_building",
            Self::Generating => "generating",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The successful outcome of a pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// The generated answer text.
    pub text: String,
    /// The documents that formed the context, most relevant first.
    pub sources: Vec<Source>,
    /// The context block sent to the generator.
    pub context: ContextBlock,
}

/// The RAG pipeline orchestrator.
///
/// Holds no per-question state: every call takes a fresh corpus snapshot and
/// produces exactly one [`Answer`] or one [`RagError`]. Construct one via
/// [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    corpus: Arc<dyn Corpus>,
    generator: Arc<dyn Generator>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the corpus.
    pub fn corpus(&self) -> &Arc<dyn Corpus> {
        &self.corpus
    }

    /// Answer `question` using the configured `top_k`.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn answer(&self, question: &str) -> Result<String> {
        self.answer_with_top_k(question, self.config.top_k).await
    }

    /// Answer `question` retrieving at most `top_k` documents.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn answer_with_top_k(&self, question: &str, top_k: usize) -> Result<String> {
        self.run(question, top_k).await.map(|answer| answer.text)
    }

    /// Run the full pipeline and return the answer with its sources.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidArgument`] for an empty question or `top_k == 0`
    /// - [`RagError::EmbeddingError`] / [`RagError::Timeout`] from the embedding step
    /// - [`RagError::CorpusError`] if the corpus snapshot cannot be read
    /// - [`RagError::DimensionMismatch`] if the query or a document vector has
    ///   the wrong length
    /// - [`RagError::GenerationError`] / [`RagError::Timeout`] from the generation step
    pub async fn run(&self, question: &str, top_k: usize) -> Result<Answer> {
        let mut stage = PipelineStage::Embedding;
        let result = self.execute(question, top_k, &mut stage).await;
        match &result {
            Ok(answer) => {
                transition(&mut stage, PipelineStage::Done);
                info!(source_count = answer.sources.len(), "question answered");
            }
            Err(e) => {
                error!(stage = %stage, kind = %e.kind(), error = %e, "pipeline failed");
                transition(&mut stage, PipelineStage::Failed);
            }
        }
        result
    }

    async fn execute(
        &self,
        question: &str,
        top_k: usize,
        stage: &mut PipelineStage,
    ) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidArgument("question must not be empty".to_string()));
        }
        if top_k == 0 {
            return Err(RagError::InvalidArgument("top_k must be greater than zero".to_string()));
        }

        // 1. Embed the question
        let query =
            with_timeout("embed", self.config.embed_timeout, self.embedding_provider.embed(question))
                .await?;
        let expected = self.embedding_provider.dimensions();
        if query.len() != expected {
            return Err(RagError::DimensionMismatch { expected, actual: query.len() });
        }

        // 2. Rank a fresh corpus snapshot
        transition(stage, PipelineStage::Ranking);
        let mut documents = self.corpus.all_documents().await?;
        if let Some(limit) = self.config.field_char_limit {
            documents.iter_mut().for_each(|doc| cap_text_fields(doc, limit));
        }
        let ranked =
            rank(&query, &documents, top_k, &self.config.scoring, &self.config.primary_field)?;
        if ranked.is_empty() {
            info!(corpus_size = documents.len(), "no eligible documents, answering from empty context");
        }

        // 3. Build the context
        transition(stage, PipelineStage::ContextBuilding);
        let mut builder = ContextBuilder::new();
        if let Some(max) = self.config.max_context_items {
            builder = builder.with_max_items(max);
        }
        let context = builder.build(&ranked);
        let sources: Vec<Source> =
            ranked.iter().take(context.len()).map(|candidate| candidate.to_source()).collect();

        // 4. Generate the answer
        transition(stage, PipelineStage::Generating);
        let user_prompt = compose_user_prompt(&context, question);
        let text = with_timeout(
            "generate",
            self.config.generate_timeout,
            self.generator.complete(&self.config.system_prompt, &user_prompt),
        )
        .await?;

        Ok(Answer { text, sources, context })
    }
}

fn transition(stage: &mut PipelineStage, next: PipelineStage) {
    debug!(from = %stage, to = %next, "pipeline stage transition");
    *stage = next;
}

async fn with_timeout<T>(
    operation: &str,
    timeout: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, fut).await.map_err(|_| RagError::Timeout {
        operation: operation.to_string(),
        timeout,
    })?
}

/// Builder for constructing a [`RagPipeline`].
///
/// All fields except `config` are required; a missing config falls back to
/// [`RagConfig::default()`]. Call [`build()`](RagPipelineBuilder::build) to
/// validate and produce the pipeline.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::builder().top_k(5).build()?)
///     .embedding_provider(Arc::new(embedder))
///     .corpus(Arc::new(corpus))
///     .generator(Arc::new(generator))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    corpus: Option<Arc<dyn Corpus>>,
    generator: Option<Arc<dyn Generator>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the corpus to retrieve from.
    pub fn corpus(mut self, corpus: Arc<dyn Corpus>) -> Self {
        self.corpus = Some(corpus);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let corpus =
            self.corpus.ok_or_else(|| RagError::ConfigError("corpus is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;

        Ok(RagPipeline {
            config: self.config.unwrap_or_default(),
            embedding_provider,
            corpus,
            generator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_stages() {
        assert!(PipelineStage::Done.is_terminal());
        assert!(PipelineStage::Failed.is_terminal());
        assert!(!PipelineStage::Generating.is_terminal());
        assert_eq!(PipelineStage::ContextBuilding.to_string(), "context_building");
    }

    #[tokio::test(start_paused = true)]
    async fn with_timeout_maps_elapsed() {
        let err = with_timeout("embed", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RagError::Timeout { ref operation, .. } if operation == "embed"));
    }
}
