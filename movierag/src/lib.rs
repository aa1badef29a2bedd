//! # movierag
//!
//! Retrieval-augmented question answering over a small movie corpus.
//!
//! ## Overview
//!
//! A question flows through four stages:
//!
//! ```text
//! question -> EmbeddingProvider -> query vector
//!          -> rank (cosine similarity over a Corpus snapshot) -> top-K
//!          -> ContextBuilder -> ContextBlock
//!          -> Generator -> answer
//! ```
//!
//! - [`EmbeddingProvider`], [`Corpus`], and [`Generator`] are the external
//!   collaborators; implement them to plug in a model or a document store.
//! - [`cosine_similarity`], [`score_document`], and [`rank`] are the pure
//!   retrieval core.
//! - [`RagPipeline`] sequences the stages, enforces the per-call timeouts,
//!   and reports every failure as a typed [`RagError`].
//!
//! ## Features
//!
//! - `openai` – [`openai::OpenAIEmbeddingProvider`] and
//!   [`openai::OpenAIGenerator`] for any OpenAI-compatible endpoint.

pub mod config;
pub mod context;
pub mod corpus;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod pipeline;
pub mod ranker;
pub mod similarity;
pub mod vectorize;

#[cfg(feature = "openai")]
pub mod openai;

pub use config::{DEFAULT_SYSTEM_PROMPT, RagConfig, RagConfigBuilder, ScoringStrategy};
pub use context::{ContextBlock, ContextBuilder, cap_text_fields};
pub use corpus::{Corpus, InMemoryCorpus};
pub use document::{Document, ScoredCandidate, Source};
pub use embedding::EmbeddingProvider;
pub use error::{FailureKind, RagError, Result};
pub use generation::{Generator, compose_user_prompt};
pub use pipeline::{Answer, PipelineStage, RagPipeline, RagPipelineBuilder};
pub use ranker::rank;
pub use similarity::{DocumentScore, cosine_similarity, score_document};
pub use vectorize::{VectorField, Vectorizer};
