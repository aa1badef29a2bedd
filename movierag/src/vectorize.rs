//! Batch population of document field vectors.
//!
//! This runs outside the question-answering path, typically as an offline
//! job before a corpus is served.

use std::sync::Arc;

use tracing::{error, info};

use crate::document::{
    ACTORS_VECTOR, CONTENT_VECTOR, DESCRIPTION_VECTOR, Document, REVIEWS_VECTOR, TITLE_VECTOR,
};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// A text field that can be embedded into a named field vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorField {
    Title,
    Description,
    Actors,
    Reviews,
    /// Every text attribute rendered together.
    Content,
}

impl VectorField {
    /// All fields, in the order they are embedded.
    pub const ALL: [VectorField; 5] =
        [Self::Title, Self::Description, Self::Actors, Self::Reviews, Self::Content];

    /// The field vector name this field is stored under.
    pub fn vector_name(self) -> &'static str {
        match self {
            Self::Title => TITLE_VECTOR,
            Self::Description => DESCRIPTION_VECTOR,
            Self::Actors => ACTORS_VECTOR,
            Self::Reviews => REVIEWS_VECTOR,
            Self::Content => CONTENT_VECTOR,
        }
    }

    /// The source text for this field, or `None` when there is nothing to embed.
    pub fn source_text(self, doc: &Document) -> Option<String> {
        let text = match self {
            Self::Title => doc.title.clone(),
            Self::Description => doc.description.clone(),
            Self::Actors => doc.actors.join(", "),
            Self::Reviews => doc.reviews.join("\n"),
            Self::Content => {
                let mut parts = vec![doc.title.clone()];
                if let Some(year) = doc.year {
                    parts.push(year.to_string());
                }
                parts.extend(
                    [&doc.genre, &doc.description].into_iter().filter(|s| !s.is_empty()).cloned(),
                );
                if !doc.actors.is_empty() {
                    parts.push(doc.actors.join(", "));
                }
                parts.join("\n")
            }
        };
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

/// Fills [`Document::vectors`] using an [`EmbeddingProvider`].
pub struct Vectorizer {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    fields: Vec<VectorField>,
}

impl Vectorizer {
    /// Create a vectorizer that embeds every [`VectorField`].
    pub fn new(embedding_provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedding_provider, fields: VectorField::ALL.to_vec() }
    }

    /// Restrict the fields that are embedded.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = VectorField>) -> Self {
        self.fields = fields.into_iter().collect();
        self
    }

    /// Embed the configured fields of every document, one batch per field.
    ///
    /// Fields with no source text are left absent. Existing vectors for the
    /// configured fields are overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the provider fails or returns
    /// the wrong number of vectors, and [`RagError::DimensionMismatch`] if a
    /// vector's length differs from the provider's `dimensions()`.
    pub async fn vectorize(&self, documents: &mut [Document]) -> Result<()> {
        let dimensions = self.embedding_provider.dimensions();

        for &field in &self.fields {
            // 1. Collect the documents that have text for this field
            let sources: Vec<(usize, String)> = documents
                .iter()
                .enumerate()
                .filter_map(|(i, doc)| field.source_text(doc).map(|text| (i, text)))
                .collect();
            if sources.is_empty() {
                continue;
            }

            // 2. Embed them as one batch
            let texts: Vec<&str> = sources.iter().map(|(_, text)| text.as_str()).collect();
            let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
                error!(field = field.vector_name(), error = %e, "embedding failed during vectorization");
                e
            })?;
            if embeddings.len() != texts.len() {
                return Err(RagError::EmbeddingError {
                    provider: self.embedding_provider.name().to_string(),
                    message: format!(
                        "expected {} embeddings for '{}', got {}",
                        texts.len(),
                        field.vector_name(),
                        embeddings.len()
                    ),
                });
            }

            // 3. Attach them to their documents
            for ((index, _), embedding) in sources.iter().zip(embeddings) {
                if embedding.len() != dimensions {
                    return Err(RagError::DimensionMismatch {
                        expected: dimensions,
                        actual: embedding.len(),
                    });
                }
                documents[*index].vectors.insert(field.vector_name().to_string(), embedding);
            }

            info!(field = field.vector_name(), document_count = sources.len(), "vectorized field");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct LengthEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LengthEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    struct WrongSizeEmbedder;

    #[async_trait]
    impl EmbeddingProvider for WrongSizeEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0])
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    #[tokio::test]
    async fn fills_only_fields_with_text() {
        let mut docs = vec![
            Document::new("1", "Alien").with_description("Space horror"),
            Document::new("2", "Heat"),
        ];
        Vectorizer::new(Arc::new(LengthEmbedder))
            .with_fields([VectorField::Title, VectorField::Description])
            .vectorize(&mut docs)
            .await
            .unwrap();

        assert_eq!(docs[0].vector(TITLE_VECTOR), Some(&[5.0, 1.0][..]));
        assert_eq!(docs[0].vector(DESCRIPTION_VECTOR), Some(&[12.0, 1.0][..]));
        assert!(docs[1].vector(TITLE_VECTOR).is_some());
        assert!(docs[1].vector(DESCRIPTION_VECTOR).is_none());
    }

    #[tokio::test]
    async fn rejects_wrong_dimensions() {
        let mut docs = vec![Document::new("1", "Alien")];
        let err = Vectorizer::new(Arc::new(WrongSizeEmbedder)).vectorize(&mut docs).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 4, actual: 1 }));
    }

    #[test]
    fn content_joins_text_fields() {
        let doc = Document::new("1", "Alien")
            .with_year(1979)
            .with_genre("Horror")
            .with_actors(["Sigourney Weaver"]);
        assert_eq!(
            VectorField::Content.source_text(&doc).unwrap(),
            "Alien\n1979\nHorror\nSigourney Weaver"
        );
        assert_eq!(VectorField::Reviews.source_text(&doc), None);
    }
}
