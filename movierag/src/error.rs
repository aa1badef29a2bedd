//! Error types for the `movierag` crate.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while answering a question.
#[derive(Debug, Error)]
pub enum RagError {
    /// A caller-supplied argument was malformed (empty question, `top_k == 0`).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Two vectors that must have the same length did not.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The length of the reference vector.
        expected: usize,
        /// The length of the offending vector.
        actual: usize,
    },

    /// The embedding provider failed to produce a vector.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The answer generator failed to produce a completion.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generator that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An external call did not complete within its budget.
    #[error("Timeout: {operation} did not complete within {}ms", .timeout.as_millis())]
    Timeout {
        /// The operation that timed out (`embed` or `generate`).
        operation: String,
        /// The budget that was exceeded.
        timeout: Duration,
    },

    /// The corpus snapshot could not be read or written.
    #[error("Corpus error ({backend}): {message}")]
    CorpusError {
        /// The corpus backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// The coarse category of a [`RagError`].
///
/// Callers that only need to branch on what went wrong (retry a transport
/// failure, report a bad argument) match on this instead of the full error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    InvalidArgument,
    DimensionMismatch,
    EmbeddingFailure,
    GenerationFailure,
    Timeout,
    CorpusFailure,
    ConfigFailure,
}

impl FailureKind {
    /// Whether this failure came from an external collaborator rather than
    /// from a contract violation by the caller.
    pub fn is_transport(self) -> bool {
        matches!(
            self,
            Self::EmbeddingFailure | Self::GenerationFailure | Self::Timeout | Self::CorpusFailure
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidArgument => "InvalidArgument",
            Self::DimensionMismatch => "DimensionMismatch",
            Self::EmbeddingFailure => "EmbeddingFailure",
            Self::GenerationFailure => "GenerationFailure",
            Self::Timeout => "Timeout",
            Self::CorpusFailure => "CorpusFailure",
            Self::ConfigFailure => "ConfigFailure",
        };
        f.write_str(name)
    }
}

impl RagError {
    /// Return the [`FailureKind`] of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidArgument(_) => FailureKind::InvalidArgument,
            Self::DimensionMismatch { .. } => FailureKind::DimensionMismatch,
            Self::EmbeddingError { .. } => FailureKind::EmbeddingFailure,
            Self::GenerationError { .. } => FailureKind::GenerationFailure,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::CorpusError { .. } => FailureKind::CorpusFailure,
            Self::ConfigError(_) => FailureKind::ConfigFailure,
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let err = RagError::EmbeddingError { provider: "mock".into(), message: "down".into() };
        assert_eq!(err.kind(), FailureKind::EmbeddingFailure);
        assert!(err.kind().is_transport());

        let err = RagError::InvalidArgument("top_k must be greater than zero".into());
        assert_eq!(err.kind(), FailureKind::InvalidArgument);
        assert!(!err.kind().is_transport());
    }

    #[test]
    fn timeout_message_includes_budget() {
        let err = RagError::Timeout { operation: "embed".into(), timeout: Duration::from_secs(2) };
        assert_eq!(err.to_string(), "Timeout: embed did not complete within 2000ms");
        assert_eq!(err.kind().to_string(), "Timeout");
    }
}
