//! Answer generator trait and prompt composition.

use async_trait::async_trait;

use crate::context::ContextBlock;
use crate::error::Result;

/// Placeholder sent in place of an empty context block.
pub const EMPTY_CONTEXT: &str = "(no relevant movies were found)";

/// A generative model that completes a system + user prompt pair.
///
/// Like [`EmbeddingProvider`](crate::EmbeddingProvider), any retry policy
/// lives in the implementation. Failures should be reported as
/// [`RagError::GenerationError`](crate::RagError::GenerationError).
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce an answer for `user_prompt` under the `system_prompt` instruction.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// A short name used in logs and error messages.
    fn name(&self) -> &str {
        "generator"
    }
}

/// Compose the user prompt from the retrieved context and the question.
pub fn compose_user_prompt(context: &ContextBlock, question: &str) -> String {
    let context = if context.is_empty() { EMPTY_CONTEXT.to_string() } else { context.to_string() };
    format!("Context:\n{context}\n\nQuestion: {question}")
}
