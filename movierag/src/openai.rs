//! OpenAI-compatible embedding and chat providers.
//!
//! This module is only available when the `openai` feature is enabled. Any
//! endpoint that speaks the OpenAI `/v1/embeddings` and
//! `/v1/chat/completions` protocol works (OpenAI, Azure OpenAI proxies,
//! Ollama, vLLM) by pointing `base_url` at it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::Generator;

/// The default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The default model for embeddings.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The default model for answer generation.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Output dimensionality of the OpenAI embedding models, used when no
/// explicit `embedding_dimensions` is configured.
const KNOWN_EMBEDDING_DIMENSIONS: &[(&str, usize)] = &[
    ("text-embedding-3-small", 1536),
    ("text-embedding-3-large", 3072),
    ("text-embedding-ada-002", 1536),
];

fn native_dimensions(model: &str) -> Option<usize> {
    KNOWN_EMBEDDING_DIMENSIONS.iter().find(|(name, _)| *name == model).map(|(_, dims)| *dims)
}

/// Endpoint, credentials, and model selection for the OpenAI providers.
///
/// Passed explicitly to each provider so that pipelines with different
/// models can coexist.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    /// Embedding size. For the OpenAI models this is sent as a Matryoshka
    /// override; for other models it declares the size the endpoint returns.
    pub embedding_dimensions: Option<usize>,
    pub temperature: Option<f32>,
}

impl OpenAIConfig {
    /// Create a config for the public OpenAI API with default models.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENAI_API_BASE.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_dimensions: None,
            temperature: None,
        }
    }

    /// Read `OPENAI_API_KEY` and, if set, `OPENAI_BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `OPENAI_API_KEY` is not set.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            RagError::ConfigError("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn with_embedding_dimensions(mut self, dims: usize) -> Self {
        self.embedding_dimensions = Some(dims);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }
}

/// An [`EmbeddingProvider`] backed by the `/embeddings` endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use movierag::openai::{OpenAIConfig, OpenAIEmbeddingProvider};
///
/// let provider = OpenAIEmbeddingProvider::new(OpenAIConfig::from_env()?)?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    config: OpenAIConfig,
    dimensions: usize,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the API key is empty, and
    /// [`RagError::ConfigError`] if `embedding_dimensions` is unset for a model
    /// whose output size is not known (any non-OpenAI model served from a
    /// compatible endpoint).
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(RagError::EmbeddingError {
                provider: "OpenAI".into(),
                message: "API key must not be empty".into(),
            });
        }
        let dimensions = config
            .embedding_dimensions
            .or_else(|| native_dimensions(&config.embedding_model))
            .ok_or_else(|| {
                RagError::ConfigError(format!(
                    "embedding dimensions must be set for model '{}'",
                    config.embedding_model
                ))
            })?;
        Ok(Self { client: reqwest::Client::new(), config, dimensions })
    }

    /// The `dimensions` request parameter. Only OpenAI models accept it, and
    /// only when it shortens their native output.
    fn requested_dimensions(&self) -> Option<usize> {
        native_dimensions(&self.config.embedding_model)
            .filter(|native| *native != self.dimensions)
            .map(|_| self.dimensions)
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Send `body` to `url` and decode the JSON reply, describing any failure as
/// a plain message for the caller to wrap.
async fn post_json<B, R>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &B,
) -> std::result::Result<R, String>
where
    B: Serialize + ?Sized,
    R: for<'de> Deserialize<'de>,
{
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await
        .map_err(|e| format!("request failed: {e}"))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail =
            serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
        return Err(format!("API returned {status}: {detail}"));
    }

    response.json().await.map_err(|e| format!("failed to parse response: {e}"))
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "OpenAI", text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: "OpenAI".into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "OpenAI",
            batch_size = texts.len(),
            model = %self.config.embedding_model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: texts.to_vec(),
            dimensions: self.requested_dimensions(),
        };

        let response: EmbeddingResponse = post_json(
            &self.client,
            &self.config.endpoint("embeddings"),
            &self.config.api_key,
            &request_body,
        )
        .await
        .map_err(|message| {
            error!(provider = "OpenAI", error = %message, "embedding request failed");
            RagError::EmbeddingError { provider: "OpenAI".into(), message }
        })?;

        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.config.embedding_model
    }
}

/// A [`Generator`] backed by the `/chat/completions` endpoint.
pub struct OpenAIGenerator {
    client: reqwest::Client,
    config: OpenAIConfig,
}

impl OpenAIGenerator {
    /// Create a new generator from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationError`] if the API key is empty.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(RagError::GenerationError {
                provider: "OpenAI".into(),
                message: "API key must not be empty".into(),
            });
        }
        Ok(Self { client: reqwest::Client::new(), config })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        debug!(
            provider = "OpenAI",
            model = %self.config.chat_model,
            prompt_len = user_prompt.len(),
            "requesting completion"
        );

        let request_body = ChatRequest {
            model: &self.config.chat_model,
            messages: [
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
            temperature: self.config.temperature,
        };

        let response: ChatResponse = post_json(
            &self.client,
            &self.config.endpoint("chat/completions"),
            &self.config.api_key,
            &request_body,
        )
        .await
        .map_err(|message| {
            error!(provider = "OpenAI", error = %message, "completion request failed");
            RagError::GenerationError { provider: "OpenAI".into(), message }
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RagError::GenerationError {
                provider: "OpenAI".into(),
                message: "API returned no completion".into(),
            })
    }

    fn name(&self) -> &str {
        &self.config.chat_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = OpenAIConfig::new("sk-test").with_base_url("http://localhost:11434/v1/");
        assert_eq!(config.endpoint("embeddings"), "http://localhost:11434/v1/embeddings");
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = OpenAIEmbeddingProvider::new(OpenAIConfig::new("")).err().unwrap();
        assert!(matches!(err, RagError::EmbeddingError { .. }));
        let err = OpenAIGenerator::new(OpenAIConfig::new("")).err().unwrap();
        assert!(matches!(err, RagError::GenerationError { .. }));
    }

    #[test]
    fn dimensions_follow_override() {
        let provider =
            OpenAIEmbeddingProvider::new(OpenAIConfig::new("sk-test").with_embedding_dimensions(256))
                .unwrap();
        assert_eq!(provider.dimensions(), 256);
    }

    #[test]
    fn dimensions_follow_known_model() {
        let small = OpenAIEmbeddingProvider::new(OpenAIConfig::new("sk-test")).unwrap();
        assert_eq!(small.dimensions(), 1536);

        let large = OpenAIEmbeddingProvider::new(
            OpenAIConfig::new("sk-test").with_embedding_model("text-embedding-3-large"),
        )
        .unwrap();
        assert_eq!(large.dimensions(), 3072);
    }

    #[test]
    fn unknown_model_requires_explicit_dimensions() {
        let config = OpenAIConfig::new("sk-test").with_embedding_model("nomic-embed-text");
        let err = OpenAIEmbeddingProvider::new(config.clone()).err().unwrap();
        assert!(matches!(err, RagError::ConfigError(_)));

        let provider = OpenAIEmbeddingProvider::new(config.with_embedding_dimensions(768)).unwrap();
        assert_eq!(provider.dimensions(), 768);
        assert_eq!(provider.requested_dimensions(), None);
    }

    #[test]
    fn shortened_openai_model_requests_dimensions() {
        let provider =
            OpenAIEmbeddingProvider::new(OpenAIConfig::new("sk-test").with_embedding_dimensions(256))
                .unwrap();
        assert_eq!(provider.requested_dimensions(), Some(256));

        let native = OpenAIEmbeddingProvider::new(OpenAIConfig::new("sk-test")).unwrap();
        assert_eq!(native.requested_dimensions(), None);
    }

    #[test]
    fn chat_request_shape() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: [
                ChatMessage { role: "system", content: "be brief" },
                ChatMessage { role: "user", content: "hi" },
            ],
            temperature: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert!(json.get("temperature").is_none());
    }
}
