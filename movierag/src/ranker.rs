//! Top-K ranking of a corpus snapshot against a query vector.

use std::cmp::Ordering;

use tracing::debug;

use crate::config::ScoringStrategy;
use crate::document::{Document, ScoredCandidate};
use crate::error::{RagError, Result};
use crate::similarity::score_document;

/// Rank `documents` against `query` and keep the `top_k` best.
///
/// Results are ordered by descending score. Equal scores keep the order in
/// which the documents appear in `documents`. Ineligible documents (see
/// [`score_document`]) are skipped; fewer than `top_k` eligible documents
/// yields all of them, and none yields an empty vector.
///
/// # Errors
///
/// Returns [`RagError::InvalidArgument`] if `top_k == 0`, or
/// [`RagError::DimensionMismatch`] if a scored vector differs in length from
/// `query`.
pub fn rank<'a>(
    query: &[f32],
    documents: &'a [Document],
    top_k: usize,
    strategy: &ScoringStrategy,
    primary_field: &str,
) -> Result<Vec<ScoredCandidate<'a>>> {
    if top_k == 0 {
        return Err(RagError::InvalidArgument("top_k must be greater than zero".to_string()));
    }

    let mut scored = Vec::with_capacity(documents.len());
    for document in documents {
        if let Some(doc_score) = score_document(query, document, strategy, primary_field)? {
            scored.push(ScoredCandidate {
                document,
                score: doc_score.score,
                field_scores: doc_score.field_scores,
            });
        }
    }

    let eligible = scored.len();
    // `sort_by` is stable, so ties stay in corpus order.
    scored.sort_by(|a, b| descending(a.score, b.score));
    scored.truncate(top_k);

    debug!(corpus_size = documents.len(), eligible, returned = scored.len(), "ranked corpus");
    Ok(scored)
}

fn descending(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DESCRIPTION_VECTOR;

    fn doc(id: &str, vector: Vec<f32>) -> Document {
        Document::new(id, id).with_vector(DESCRIPTION_VECTOR, vector)
    }

    fn ids(candidates: &[ScoredCandidate<'_>]) -> Vec<String> {
        candidates.iter().map(|c| c.document.id.clone()).collect()
    }

    #[test]
    fn returns_sorted_by_score() {
        let docs = vec![
            doc("far", vec![0.0, 1.0, 0.0]),
            doc("close", vec![1.0, 0.0, 0.0]),
            doc("medium", vec![0.5, 0.5, 0.0]),
        ];
        let ranked =
            rank(&[1.0, 0.0, 0.0], &docs, 3, &ScoringStrategy::PrimaryField, DESCRIPTION_VECTOR)
                .unwrap();
        assert_eq!(ids(&ranked), ["close", "medium", "far"]);
    }

    #[test]
    fn ties_keep_corpus_order() {
        // A and B score identically (0.6), C lower.
        let docs = vec![
            doc("A", vec![0.6, 0.8]),
            doc("B", vec![0.6, 0.8]),
            doc("C", vec![0.0, 1.0]),
        ];
        let ranked = rank(&[1.0, 0.0], &docs, 2, &ScoringStrategy::PrimaryField, DESCRIPTION_VECTOR)
            .unwrap();
        assert_eq!(ids(&ranked), ["A", "B"]);
    }

    #[test]
    fn extreme_magnitudes_rank_by_direction() {
        let docs = vec![
            doc("weak", vec![0.0, 1.0]),
            doc("exact", vec![1e20, 0.0]),
            doc("tiny", vec![1e-25, 1e-26]),
        ];
        let ranked =
            rank(&[1.0, 0.0], &docs, 2, &ScoringStrategy::PrimaryField, DESCRIPTION_VECTOR)
                .unwrap();
        assert_eq!(ids(&ranked), ["exact", "tiny"]);
        assert!((ranked[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn skips_unvectorized_documents() {
        let docs = vec![Document::new("bare", "bare"), doc("x", vec![1.0, 0.0])];
        let ranked = rank(&[1.0, 0.0], &docs, 5, &ScoringStrategy::PrimaryField, DESCRIPTION_VECTOR)
            .unwrap();
        assert_eq!(ids(&ranked), ["x"]);
    }

    #[test]
    fn empty_corpus_is_empty_result() {
        let ranked = rank(&[1.0], &[], 3, &ScoringStrategy::Max, DESCRIPTION_VECTOR).unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn zero_top_k_is_invalid() {
        let docs = vec![doc("x", vec![1.0])];
        let err = rank(&[1.0], &docs, 0, &ScoringStrategy::PrimaryField, DESCRIPTION_VECTOR)
            .unwrap_err();
        assert!(matches!(err, RagError::InvalidArgument(_)));
    }

    #[test]
    fn mismatched_document_vector_fails() {
        let docs = vec![doc("x", vec![1.0, 0.0])];
        let err = rank(&[1.0, 0.0, 0.0], &docs, 1, &ScoringStrategy::PrimaryField, DESCRIPTION_VECTOR)
            .unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { .. }));
    }
}
