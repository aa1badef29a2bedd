//! Cosine similarity and per-document composite scoring.

use std::collections::BTreeMap;

use crate::config::ScoringStrategy;
use crate::document::Document;
use crate::error::{RagError, Result};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 means identical direction. If either
/// vector has zero magnitude the result is `0.0`.
///
/// # Errors
///
/// Returns [`RagError::DimensionMismatch`] if the vectors differ in length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(RagError::DimensionMismatch { expected: a.len(), actual: b.len() });
    }

    // Squares of f32 components underflow below ~1e-19 and overflow above ~1e19.
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    // Rounding can push identical directions just past 1.
    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32)
}

/// The composite score of one document and the field scores behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentScore {
    pub score: f32,
    pub field_scores: BTreeMap<String, f32>,
}

/// Score `document` against `query` under the given strategy.
///
/// Returns `Ok(None)` when the document is not eligible: it lacks
/// `primary_field` under [`ScoringStrategy::PrimaryField`], or carries no
/// vectors at all under the multi-field strategies.
///
/// # Errors
///
/// Returns [`RagError::DimensionMismatch`] if a scored field vector differs in
/// length from the query.
pub fn score_document(
    query: &[f32],
    document: &Document,
    strategy: &ScoringStrategy,
    primary_field: &str,
) -> Result<Option<DocumentScore>> {
    match strategy {
        ScoringStrategy::PrimaryField => {
            let Some(vector) = document.vector(primary_field) else {
                return Ok(None);
            };
            let score = cosine_similarity(query, vector)?;
            Ok(Some(DocumentScore {
                score,
                field_scores: BTreeMap::from([(primary_field.to_string(), score)]),
            }))
        }
        ScoringStrategy::Max => {
            let Some(field_scores) = all_field_scores(query, document)? else {
                return Ok(None);
            };
            let score = field_scores.values().copied().fold(f32::NEG_INFINITY, f32::max);
            Ok(Some(DocumentScore { score, field_scores }))
        }
        ScoringStrategy::WeightedSum { weights } => {
            let Some(field_scores) = all_field_scores(query, document)? else {
                return Ok(None);
            };
            let score: f32 = field_scores
                .iter()
                .map(|(field, s)| weights.get(field).copied().unwrap_or(0.0) * s)
                .sum();
            Ok(Some(DocumentScore { score, field_scores }))
        }
    }
}

fn all_field_scores(query: &[f32], document: &Document) -> Result<Option<BTreeMap<String, f32>>> {
    if !document.is_vectorized() {
        return Ok(None);
    }
    document
        .vectors
        .iter()
        .map(|(field, vector)| Ok((field.clone(), cosine_similarity(query, vector)?)))
        .collect::<Result<BTreeMap<_, _>>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DESCRIPTION_VECTOR, TITLE_VECTOR};

    fn doc() -> Document {
        Document::new("m1", "Alien")
            .with_vector(TITLE_VECTOR, vec![1.0, 0.0])
            .with_vector(DESCRIPTION_VECTOR, vec![0.0, 1.0])
    }

    #[test]
    fn cosine_identical() {
        let a = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&a, &a).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).unwrap();
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[-1.0, 0.0, 0.0]).unwrap();
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.3, 0.4], &[0.0, 0.0]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn cosine_tiny_components_keep_direction() {
        let a = [1e-25, 0.0];
        assert!((cosine_similarity(&a, &a).unwrap() - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &[0.0, 1e-25]).unwrap().abs() < 1e-6);
    }

    #[test]
    fn cosine_huge_components_do_not_overflow() {
        let a = [1e20, 1e20];
        let sim = cosine_similarity(&a, &a).unwrap();
        assert!((sim - 1.0).abs() < 1e-6, "cosine(a, a) = {sim}");
        let sim = cosine_similarity(&a, &[-1e20, -1e20]).unwrap();
        assert!((sim + 1.0).abs() < 1e-6, "cosine(a, -a) = {sim}");
    }

    #[test]
    fn cosine_rejects_length_mismatch() {
        let err = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn primary_field_scores_only_that_field() {
        let scored = score_document(&[1.0, 0.0], &doc(), &ScoringStrategy::PrimaryField, DESCRIPTION_VECTOR)
            .unwrap()
            .unwrap();
        assert!(scored.score.abs() < 1e-6);
        assert_eq!(scored.field_scores.len(), 1);
    }

    #[test]
    fn primary_field_missing_is_ineligible() {
        let doc = Document::new("m2", "Heat").with_vector(TITLE_VECTOR, vec![1.0, 0.0]);
        let scored =
            score_document(&[1.0, 0.0], &doc, &ScoringStrategy::PrimaryField, DESCRIPTION_VECTOR)
                .unwrap();
        assert!(scored.is_none());
    }

    #[test]
    fn max_takes_best_field() {
        let scored = score_document(&[1.0, 0.0], &doc(), &ScoringStrategy::Max, DESCRIPTION_VECTOR)
            .unwrap()
            .unwrap();
        assert!((scored.score - 1.0).abs() < 1e-6);
        assert_eq!(scored.field_scores.len(), 2);
    }

    #[test]
    fn weighted_sum_ignores_unweighted_fields() {
        let weights = BTreeMap::from([(TITLE_VECTOR.to_string(), 0.5)]);
        let strategy = ScoringStrategy::WeightedSum { weights };
        let scored = score_document(&[1.0, 0.0], &doc(), &strategy, DESCRIPTION_VECTOR)
            .unwrap()
            .unwrap();
        assert!((scored.score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn weighted_sum_missing_field_contributes_nothing() {
        let weights = BTreeMap::from([
            (TITLE_VECTOR.to_string(), 0.5),
            (DESCRIPTION_VECTOR.to_string(), 0.5),
        ]);
        let strategy = ScoringStrategy::WeightedSum { weights };
        let partial = Document::new("m3", "Ran").with_vector(TITLE_VECTOR, vec![1.0, 0.0]);
        let scored = score_document(&[1.0, 0.0], &partial, &strategy, DESCRIPTION_VECTOR)
            .unwrap()
            .unwrap();
        assert!((scored.score - 0.5).abs() < 1e-6);
        assert!(!scored.field_scores.contains_key(DESCRIPTION_VECTOR));
    }

    #[test]
    fn unvectorized_document_is_ineligible() {
        let bare = Document::new("m4", "Solaris");
        assert!(score_document(&[1.0], &bare, &ScoringStrategy::Max, DESCRIPTION_VECTOR)
            .unwrap()
            .is_none());
    }

    #[test]
    fn field_dimension_mismatch_fails() {
        let err = score_document(&[1.0, 0.0, 0.0], &doc(), &ScoringStrategy::Max, DESCRIPTION_VECTOR)
            .unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { .. }));
    }
}
