//! Read-only corpus access and an in-memory implementation.
//!
//! The pipeline only ever calls [`Corpus::all_documents`]. Loading and
//! mutating documents is the job of whoever owns the corpus; the
//! [`InMemoryCorpus`] helpers exist for that side.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::Document;
use crate::error::{RagError, Result};

/// A source of documents for retrieval.
///
/// Each call returns an independent snapshot. Documents must come back in a
/// stable order, since ranking ties are broken by snapshot position.
#[async_trait]
pub trait Corpus: Send + Sync {
    /// Return a snapshot of every document in the corpus.
    async fn all_documents(&self) -> Result<Vec<Document>>;

    /// Return the number of documents in the corpus.
    async fn len(&self) -> Result<usize> {
        Ok(self.all_documents().await?.len())
    }
}

/// A corpus held in memory, in insertion order.
///
/// Backed by a `Vec` behind a `tokio::sync::RwLock`. Snapshots are cloned
/// under the read lock, so writers never affect a query already in flight.
///
/// # Example
///
/// ```rust,ignore
/// use movierag::{Corpus, Document, InMemoryCorpus};
///
/// let corpus = InMemoryCorpus::load_json("movies.json").await?;
/// corpus.upsert(vec![Document::new("tt0076759", "Star Wars")]).await;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryCorpus {
    documents: RwLock<Vec<Document>>,
}

impl InMemoryCorpus {
    /// Create a new empty corpus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a corpus from documents, later duplicates of an id replacing
    /// earlier ones in place.
    pub fn from_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let mut merged: Vec<Document> = Vec::new();
        for document in documents {
            upsert_one(&mut merged, document);
        }
        Self { documents: RwLock::new(merged) }
    }

    /// Insert or replace documents by id.
    ///
    /// A replaced document keeps its original position; new ids are appended.
    pub async fn upsert(&self, documents: impl IntoIterator<Item = Document>) {
        let mut stored = self.documents.write().await;
        for document in documents {
            upsert_one(&mut stored, document);
        }
    }

    /// Remove documents by id. Unknown ids are ignored.
    pub async fn remove(&self, ids: &[&str]) {
        let mut stored = self.documents.write().await;
        stored.retain(|d| !ids.contains(&d.id.as_str()));
    }

    /// Load a corpus from a JSON file containing an array of documents.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CorpusError`] if the file cannot be read or parsed.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| corpus_error(path, e))?;
        let documents: Vec<Document> =
            serde_json::from_str(&raw).map_err(|e| corpus_error(path, e))?;
        info!(path = %path.display(), document_count = documents.len(), "loaded corpus");
        Ok(Self::from_documents(documents))
    }

    /// Write the corpus to `path` as a pretty-printed JSON array.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CorpusError`] if serialization or the write fails.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let documents = self.documents.read().await;
        let raw = serde_json::to_string_pretty(&*documents).map_err(|e| corpus_error(path, e))?;
        tokio::fs::write(path, raw).await.map_err(|e| corpus_error(path, e))?;
        debug!(path = %path.display(), document_count = documents.len(), "saved corpus");
        Ok(())
    }
}

fn upsert_one(stored: &mut Vec<Document>, document: Document) {
    match stored.iter_mut().find(|d| d.id == document.id) {
        Some(existing) => *existing = document,
        None => stored.push(document),
    }
}

fn corpus_error(path: &Path, e: impl std::fmt::Display) -> RagError {
    RagError::CorpusError {
        backend: "InMemory".to_string(),
        message: format!("{}: {e}", path.display()),
    }
}

#[async_trait]
impl Corpus for InMemoryCorpus {
    async fn all_documents(&self) -> Result<Vec<Document>> {
        Ok(self.documents.read().await.clone())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.documents.read().await.len())
    }
}
