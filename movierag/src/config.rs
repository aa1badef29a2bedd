//! Configuration for the RAG pipeline.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::document::DESCRIPTION_VECTOR;
use crate::error::{RagError, Result};

/// The default system instruction given to the answer generator.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful movie expert. Answer the user's \
question using only the movies listed in the context. If the context is empty or does not \
contain the answer, say that no relevant movies were found.";

/// How a document's field vectors are combined into one composite score.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum ScoringStrategy {
    /// Score only the configured primary field. Documents without it are
    /// not eligible.
    #[default]
    PrimaryField,
    /// Score every field vector present and keep the best one.
    Max,
    /// Sum `weight * score` over the present fields. Fields without a
    /// weight contribute nothing.
    WeightedSum {
        /// Weight per field name.
        weights: BTreeMap<String, f32>,
    },
}

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Number of ranked documents handed to the context builder.
    pub top_k: usize,
    /// Name of the field vector used by [`ScoringStrategy::PrimaryField`].
    pub primary_field: String,
    /// Multi-field aggregation policy.
    pub scoring: ScoringStrategy,
    /// Upper bound on context excerpts. `None` keeps every ranked document.
    pub max_context_items: Option<usize>,
    /// Per-field character cap applied to documents before the context is
    /// built. `None` leaves text untouched.
    pub field_char_limit: Option<usize>,
    /// Budget for the query embedding call.
    pub embed_timeout: Duration,
    /// Budget for the answer generation call.
    pub generate_timeout: Duration,
    /// System instruction sent with every generation request.
    pub system_prompt: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            primary_field: DESCRIPTION_VECTOR.to_string(),
            scoring: ScoringStrategy::PrimaryField,
            max_context_items: None,
            field_char_limit: None,
            embed_timeout: Duration::from_secs(30),
            generate_timeout: Duration::from_secs(60),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the number of documents retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the field vector used for primary-field scoring.
    pub fn primary_field(mut self, field: impl Into<String>) -> Self {
        self.config.primary_field = field.into();
        self
    }

    /// Set the multi-field scoring strategy.
    pub fn scoring(mut self, scoring: ScoringStrategy) -> Self {
        self.config.scoring = scoring;
        self
    }

    /// Cap the number of excerpts in the context block.
    pub fn max_context_items(mut self, max: usize) -> Self {
        self.config.max_context_items = Some(max);
        self
    }

    /// Cap every text field at `limit` characters before building the context.
    pub fn field_char_limit(mut self, limit: usize) -> Self {
        self.config.field_char_limit = Some(limit);
        self
    }

    /// Set the budget for the query embedding call.
    pub fn embed_timeout(mut self, timeout: Duration) -> Self {
        self.config.embed_timeout = timeout;
        self
    }

    /// Set the budget for the answer generation call.
    pub fn generate_timeout(mut self, timeout: Duration) -> Self {
        self.config.generate_timeout = timeout;
        self
    }

    /// Replace the system instruction.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `top_k == 0`
    /// - `primary_field` is empty
    /// - either timeout is zero
    /// - `max_context_items == Some(0)`
    /// - a weighted-sum weight is negative or not finite
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if config.primary_field.trim().is_empty() {
            return Err(RagError::ConfigError("primary_field must not be empty".to_string()));
        }
        if config.embed_timeout.is_zero() || config.generate_timeout.is_zero() {
            return Err(RagError::ConfigError("timeouts must be greater than zero".to_string()));
        }
        if config.max_context_items == Some(0) {
            return Err(RagError::ConfigError(
                "max_context_items must be greater than zero".to_string(),
            ));
        }
        if let ScoringStrategy::WeightedSum { weights } = &config.scoring {
            if let Some((field, weight)) = weights.iter().find(|(_, w)| !w.is_finite() || **w < 0.0)
            {
                return Err(RagError::ConfigError(format!(
                    "weight for '{field}' must be a finite, non-negative number (got {weight})"
                )));
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = RagConfig::default();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.primary_field, "descriptionVector");
        assert_eq!(config.scoring, ScoringStrategy::PrimaryField);
        assert_eq!(config.max_context_items, None);
    }

    #[test]
    fn builder_overrides() {
        let config = RagConfig::builder()
            .top_k(5)
            .primary_field("titleVector")
            .max_context_items(2)
            .embed_timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.primary_field, "titleVector");
        assert_eq!(config.max_context_items, Some(2));
        assert_eq!(config.embed_timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().primary_field(" ").build().is_err());
        assert!(RagConfig::builder().generate_timeout(Duration::ZERO).build().is_err());
        assert!(RagConfig::builder().max_context_items(0).build().is_err());

        let weights = BTreeMap::from([("titleVector".to_string(), -1.0)]);
        let err = RagConfig::builder()
            .scoring(ScoringStrategy::WeightedSum { weights })
            .build()
            .unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn scoring_strategy_serde_shape() {
        let json = r#"{"strategy":"weighted-sum","weights":{"titleVector":0.3}}"#;
        let scoring: ScoringStrategy = serde_json::from_str(json).unwrap();
        assert_eq!(
            scoring,
            ScoringStrategy::WeightedSum {
                weights: BTreeMap::from([("titleVector".to_string(), 0.3)])
            }
        );
    }
}
