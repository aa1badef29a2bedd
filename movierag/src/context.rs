//! Context assembly: ranked candidates to a bounded text block.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::{Document, ScoredCandidate};

/// An ordered list of formatted document excerpts, most relevant first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBlock {
    excerpts: Vec<String>,
}

impl ContextBlock {
    pub fn excerpts(&self) -> &[String] {
        &self.excerpts
    }

    pub fn len(&self) -> usize {
        self.excerpts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.excerpts.is_empty()
    }
}

impl fmt::Display for ContextBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.excerpts.join("\n\n"))
    }
}

/// Serializes ranked candidates into a [`ContextBlock`].
///
/// The builder never shortens document text. Callers that need a per-field
/// cap apply [`cap_text_fields`] to the documents beforehand.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextBuilder {
    max_items: Option<usize>,
}

impl ContextBuilder {
    /// Create a builder that keeps every candidate it is given.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max` excerpts.
    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    /// Render `candidates` in order, up to the configured maximum.
    pub fn build(&self, candidates: &[ScoredCandidate<'_>]) -> ContextBlock {
        let limit = self.max_items.unwrap_or(candidates.len());
        let excerpts = candidates
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, candidate)| render_excerpt(i + 1, candidate.document))
            .collect();
        ContextBlock { excerpts }
    }
}

fn render_excerpt(position: usize, doc: &Document) -> String {
    let mut lines = vec![format!("[{position}] Title: {}", doc.title)];
    if let Some(year) = doc.year {
        lines.push(format!("Year: {year}"));
    }
    if !doc.genre.is_empty() {
        lines.push(format!("Genre: {}", doc.genre));
    }
    if !doc.actors.is_empty() {
        lines.push(format!("Actors: {}", doc.actors.join(", ")));
    }
    if !doc.description.is_empty() {
        lines.push(format!("Description: {}", doc.description));
    }
    if !doc.reviews.is_empty() {
        lines.push(format!("Reviews: {}", doc.reviews.join(" | ")));
    }
    lines.join("\n")
}

/// Truncate every text attribute of `document` to at most `max_chars`
/// characters. Vectors and the id are left alone.
pub fn cap_text_fields(document: &mut Document, max_chars: usize) {
    truncate_chars(&mut document.title, max_chars);
    truncate_chars(&mut document.description, max_chars);
    truncate_chars(&mut document.genre, max_chars);
    for actor in &mut document.actors {
        truncate_chars(actor, max_chars);
    }
    for review in &mut document.reviews {
        truncate_chars(review, max_chars);
    }
}

fn truncate_chars(text: &mut String, max_chars: usize) {
    if let Some((byte_idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(byte_idx);
    }
}
