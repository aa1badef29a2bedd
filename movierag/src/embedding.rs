//! The seam between the pipeline and an embedding model.
//!
//! The same provider embeds questions at query time and movie text fields
//! during [`Vectorizer`](crate::Vectorizer) runs, so both sides of every
//! cosine comparison come from one model and one dimensionality.

use async_trait::async_trait;

use crate::error::Result;

/// Turns question or field text into a fixed-length vector.
///
/// The pipeline calls [`embed`](EmbeddingProvider::embed) exactly once per
/// question, wrapped in `RagConfig::embed_timeout`; a call that outlives it
/// is dropped and surfaces as [`RagError::Timeout`](crate::RagError::Timeout).
/// Retries are the implementation's business.
///
/// Backend and model errors should be returned as
/// [`RagError::EmbeddingError`](crate::RagError::EmbeddingError), which the
/// pipeline reports as [`FailureKind::EmbeddingFailure`](crate::FailureKind)
/// without touching the corpus or the generator.
///
/// # Example
///
/// ```rust,ignore
/// use movierag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("space adventures with heroes").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text. The result must have [`dimensions`](Self::dimensions)
    /// elements; the pipeline rejects a query vector that does not.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, one vector per input in input order.
    ///
    /// Used by the vectorizer, never on the query path. Defaults to calling
    /// [`embed`](Self::embed) for each text in turn.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Length of every vector this provider returns. Must agree with the
    /// field vectors stored in the corpus.
    fn dimensions(&self) -> usize;

    /// Provider name for logs and `EmbeddingError::provider`.
    fn name(&self) -> &str {
        "embedder"
    }
}
