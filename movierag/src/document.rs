//! Data types for movie documents and ranked candidates.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Field name of the title embedding.
pub const TITLE_VECTOR: &str = "titleVector";
/// Field name of the description embedding, the default retrieval field.
pub const DESCRIPTION_VECTOR: &str = "descriptionVector";
/// Field name of the embedding over the joined actor list.
pub const ACTORS_VECTOR: &str = "actorsVector";
/// Field name of the embedding over the joined reviews.
pub const REVIEWS_VECTOR: &str = "reviewsVector";
/// Field name of the embedding over all text fields combined.
pub const CONTENT_VECTOR: &str = "contentVector";

/// Suffix that marks a top-level document property as a field vector.
pub const VECTOR_SUFFIX: &str = "Vector";

/// A movie in the corpus.
///
/// Field vectors are optional and keyed by field name. A missing entry means
/// the field was never embedded; it is never treated as a zero vector.
///
/// In JSON, field vectors sit next to the text attributes as top-level
/// properties whose names end in `Vector`, the layout the vectorization job
/// writes:
///
/// ```json
/// { "id": "tt0078748", "title": "Alien", "descriptionVector": [0.12, -0.03] }
/// ```
///
/// Other unknown properties are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique, stable identifier for the document.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<String>,
    /// Embeddings keyed by field name (e.g. [`DESCRIPTION_VECTOR`]).
    #[serde(flatten, deserialize_with = "field_vectors")]
    pub vectors: BTreeMap<String, Vec<f32>>,
}

/// Pick the `*Vector` properties out of the attributes left over after the
/// named fields.
fn field_vectors<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<f32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let rest = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    rest.into_iter()
        .filter(|(key, _)| key.ends_with(VECTOR_SUFFIX))
        .map(|(key, value)| {
            let vector = Vec::<f32>::deserialize(value)
                .map_err(|e| <D::Error as serde::de::Error>::custom(format!("{key}: {e}")))?;
            Ok((key, vector))
        })
        .collect()
}

impl Document {
    /// Create a document with the given id and title and no other attributes.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self { id: id.into(), title: title.into(), ..Self::default() }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_actors<I, S>(mut self, actors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actors = actors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reviews<I, S>(mut self, reviews: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reviews = reviews.into_iter().map(Into::into).collect();
        self
    }

    /// Attach (or replace) the vector for `field`.
    pub fn with_vector(mut self, field: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(field.into(), vector);
        self
    }

    /// Return the vector stored under `field`, if any.
    pub fn vector(&self, field: &str) -> Option<&[f32]> {
        self.vectors.get(field).map(Vec::as_slice)
    }

    /// Whether the document carries at least one field vector.
    pub fn is_vectorized(&self) -> bool {
        !self.vectors.is_empty()
    }
}

/// A [`Document`] paired with its composite relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate<'a> {
    /// The scored document, borrowed from the corpus snapshot.
    pub document: &'a Document,
    /// The composite score (higher is more relevant).
    pub score: f32,
    /// Per-field cosine scores that produced `score`.
    pub field_scores: BTreeMap<String, f32>,
}

impl ScoredCandidate<'_> {
    /// Reduce the candidate to an owned [`Source`] reference.
    pub fn to_source(&self) -> Source {
        Source {
            id: self.document.id.clone(),
            title: self.document.title.clone(),
            score: self.score,
        }
    }
}

/// An owned reference to a document that contributed to an answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub id: String,
    pub title: String,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_without_vectors() {
        let json = r#"{
            "id": "m1",
            "title": "Alien",
            "description": "In space no one can hear you scream.",
            "genre": "Horror",
            "year": 1979,
            "actors": ["Sigourney Weaver", "Tom Skerritt"]
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.year, Some(1979));
        assert_eq!(doc.actors.len(), 2);
        assert!(doc.reviews.is_empty());
        assert!(!doc.is_vectorized());
    }

    #[test]
    fn vectors_are_keyed_by_field() {
        let doc = Document::new("m1", "Alien")
            .with_vector(TITLE_VECTOR, vec![1.0, 0.0])
            .with_vector(DESCRIPTION_VECTOR, vec![0.0, 1.0]);
        assert!(doc.is_vectorized());
        assert_eq!(doc.vector(TITLE_VECTOR), Some(&[1.0, 0.0][..]));
        assert_eq!(doc.vector(REVIEWS_VECTOR), None);

        let json = serde_json::to_value(&doc).unwrap();
        assert!(json["descriptionVector"].is_array());
        assert!(json.get("vectors").is_none());
    }

    #[test]
    fn reads_top_level_field_vectors() {
        let json = r#"{
            "id": "m1",
            "title": "Alien",
            "titleVector": [1.0, 0.0],
            "descriptionVector": [0.0, 1.0],
            "rating": 8.5,
            "_ts": "2024-01-01"
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.vectors.len(), 2);
        assert_eq!(doc.vector(DESCRIPTION_VECTOR), Some(&[0.0, 1.0][..]));
    }

    #[test]
    fn malformed_field_vector_is_rejected() {
        let json = r#"{ "id": "m1", "title": "Alien", "titleVector": "not a vector" }"#;
        let err = serde_json::from_str::<Document>(json).unwrap_err();
        assert!(err.to_string().contains("titleVector"));
    }
}
