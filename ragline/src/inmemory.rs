//! In-memory vector store using Euclidean distance.
//!
//! [`InMemoryVectorStore`] keeps every document in a `HashMap` behind a
//! `tokio::sync::RwLock`. It mirrors the ordering semantics of the pgvector
//! store (L2 distance, nearest first, capped result count) and is meant for
//! development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::document::{Document, Embedding};
use crate::error::{RagError, Result};
use crate::registry::parse_options;
use crate::store::{DEFAULT_RESULT_LIMIT, VectorStore};

/// Registry name of the in-memory store.
pub const NAME: &str = "memory";

/// Options accepted by the `memory` registry entry.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InMemoryConfig {
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
}

fn default_result_limit() -> usize {
    DEFAULT_RESULT_LIMIT
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self { result_limit: DEFAULT_RESULT_LIMIT }
    }
}

impl InMemoryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.result_limit == 0 {
            return Err(RagError::invalid_option(NAME, "result_limit must be greater than zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Entry {
    embedding: Embedding,
    metadata: HashMap<String, Value>,
}

#[derive(Debug, Default)]
struct State {
    dimensions: Option<usize>,
    entries: HashMap<String, Entry>,
}

/// An in-memory [`VectorStore`].
///
/// The first saved embedding fixes the store's dimensionality; later saves
/// with a different length are rejected. Once the last document is deleted
/// the store accepts any dimensionality again. Embeddings with NaN or
/// infinite components are rejected.
///
/// # Example
///
/// ```rust,ignore
/// use ragline::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// let id = store.insert("hello", &[0.1, 0.2, 0.3]).await?;
/// ```
#[derive(Debug)]
pub struct InMemoryVectorStore {
    result_limit: usize,
    state: RwLock<State>,
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryVectorStore {
    /// Create an empty store returning at most five results per query.
    pub fn new() -> Self {
        Self { result_limit: DEFAULT_RESULT_LIMIT, state: RwLock::new(State::default()) }
    }

    /// Create a store from a validated config.
    pub fn with_config(config: InMemoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { result_limit: config.result_limit, state: RwLock::new(State::default()) })
    }

    /// Build from registry options.
    pub fn from_options(options: Value) -> Result<Self> {
        Self::with_config(parse_options(NAME, options)?)
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Euclidean (L2) distance, matching pgvector's `<->` operator.
fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
}

fn dimension_mismatch(expected: usize, got: usize) -> RagError {
    RagError::store(NAME, format!("expected {expected} dimensions, not {got}"))
}

fn check_finite(embedding: &[f32]) -> Result<()> {
    match embedding.iter().position(|x| !x.is_finite()) {
        Some(i) => Err(RagError::store(NAME, format!("embedding component {i} is not finite"))),
        None => Ok(()),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        NAME
    }

    async fn save(
        &self,
        id: &str,
        embedding: &[f32],
        metadata: HashMap<String, Value>,
    ) -> Result<()> {
        if id.is_empty() {
            return Err(RagError::store(NAME, "document id must not be empty"));
        }
        if embedding.is_empty() {
            return Err(RagError::store(NAME, "embedding must not be empty"));
        }
        check_finite(embedding)?;

        let mut state = self.state.write().await;
        match state.dimensions {
            Some(dims) if dims != embedding.len() => {
                return Err(dimension_mismatch(dims, embedding.len()));
            }
            Some(_) => {}
            None => state.dimensions = Some(embedding.len()),
        }
        if state.entries.contains_key(id) {
            return Err(RagError::store(NAME, format!("duplicate document id '{id}'")));
        }
        state.entries.insert(id.to_string(), Entry { embedding: embedding.to_vec(), metadata });
        Ok(())
    }

    async fn query(&self, embedding: &[f32]) -> Result<Vec<Document>> {
        check_finite(embedding)?;
        let state = self.state.read().await;
        if let Some(dims) = state.dimensions {
            if dims != embedding.len() {
                return Err(dimension_mismatch(dims, embedding.len()));
            }
        }

        let mut scored: Vec<Document> = state
            .entries
            .iter()
            .map(|(id, entry)| Document {
                id: id.clone(),
                metadata: entry.metadata.clone(),
                distance: Some(l2_distance(&entry.embedding, embedding)),
            })
            .collect();

        scored.sort_by(|a, b| {
            a.distance.unwrap_or(f32::INFINITY).total_cmp(&b.distance.unwrap_or(f32::INFINITY))
        });
        scored.truncate(self.result_limit);
        Ok(scored)
    }

    async fn find_by_id(&self, id: &str) -> Result<Document> {
        let state = self.state.read().await;
        state
            .entries
            .get(id)
            .map(|entry| Document {
                id: id.to_string(),
                metadata: entry.metadata.clone(),
                distance: None,
            })
            .ok_or_else(|| RagError::NotFound { id: id.to_string() })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.entries.remove(id);
        if state.entries.is_empty() {
            state.dimensions = None;
        }
        Ok(())
    }

    async fn close(&self) {}
}
