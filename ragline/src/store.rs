//! Vector store trait for persisting documents and searching by embedding.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::document::{Document, DocumentId, content_metadata};
use crate::error::Result;

/// Number of documents a query returns unless the store is configured otherwise.
pub const DEFAULT_RESULT_LIMIT: usize = 5;

/// A storage backend for documents with nearest-neighbour search.
///
/// Implementors provide the primitive operations ([`save`](VectorStore::save),
/// [`query`](VectorStore::query), [`find_by_id`](VectorStore::find_by_id),
/// [`delete`](VectorStore::delete), [`close`](VectorStore::close)).
/// [`insert`](VectorStore::insert) and [`update`](VectorStore::update) are
/// built on top of them.
///
/// # Example
///
/// ```rust,ignore
/// use ragline::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// let id = store.insert("some text", &embedding).await?;
/// let nearest = store.query(&query_embedding).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// A short name used in logs and errors.
    fn name(&self) -> &str;

    /// Persist an embedding and its metadata under `id`.
    ///
    /// Implementations should reject an embedding whose dimensionality does
    /// not match what the store already holds.
    async fn save(
        &self,
        id: &str,
        embedding: &[f32],
        metadata: HashMap<String, Value>,
    ) -> Result<()>;

    /// Return the nearest documents to `embedding`, closest first.
    ///
    /// The result count is capped by the store's configured limit.
    async fn query(&self, embedding: &[f32]) -> Result<Vec<Document>>;

    /// Fetch a document by id.
    ///
    /// Returns [`RagError::NotFound`](crate::RagError::NotFound) if no such
    /// document exists, so callers can branch on existence.
    async fn find_by_id(&self, id: &str) -> Result<Document>;

    /// Delete a document. Deleting a missing id is not an error.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Release pooled connections. Further calls may fail.
    async fn close(&self);

    /// Store `text` with its embedding under a freshly generated id.
    async fn insert(&self, text: &str, embedding: &[f32]) -> Result<DocumentId> {
        let id = Uuid::new_v4().to_string();
        self.save(&id, embedding, content_metadata(text)).await?;
        debug!(store = self.name(), doc_id = %id, "inserted document");
        Ok(id)
    }

    /// Replace the document stored under `id`.
    ///
    /// This is a delete followed by a save, not an atomic replace: a
    /// concurrent reader may briefly see the document as missing, and if the
    /// save fails the old document is gone.
    async fn update(&self, id: &str, text: &str, embedding: &[f32]) -> Result<DocumentId> {
        self.delete(id).await?;
        self.save(id, embedding, content_metadata(text)).await?;
        debug!(store = self.name(), doc_id = %id, "updated document");
        Ok(id.to_string())
    }
}
