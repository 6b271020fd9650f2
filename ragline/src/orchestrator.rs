//! RAG orchestrator.
//!
//! The [`RagOrchestrator`] coordinates ingest, retrieval, prompt
//! augmentation and generation by composing an embedding [`Provider`], a
//! generation [`Provider`] and a [`VectorStore`]. It performs no I/O itself;
//! each step is an independent call, and a full RAG turn is
//! ingest (optional) → retrieve → augment → generate.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragline::{CallContext, InMemoryVectorStore, MockProvider, RagOrchestrator};
//!
//! let rag = RagOrchestrator::builder()
//!     .embedding_provider(Arc::new(MockProvider::new(64)))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! let ctx = CallContext::new();
//! rag.ingest(&ctx, "Indonesia declared independence on 17 August 1945.").await?;
//! let answer = rag.answer(&ctx, "When is Indonesia's independence day?", None).await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::config::RagConfig;
use crate::context::CallContext;
use crate::document::{Document, DocumentId};
use crate::error::{RagError, Result};
use crate::prompt::{Parameters, Prompt, Role};
use crate::provider::Provider;
use crate::registry::{ProviderRegistry, StoreRegistry};
use crate::store::VectorStore;

/// Build the augmented prompt text for `query` from retrieved documents.
///
/// Each document's `content` is written on its own line, in the order
/// given, under a `Context:` header, followed by the query. Documents
/// without `content` contribute an empty line. Nothing is truncated.
///
/// ```rust
/// use ragline::{Document, augment_query};
///
/// let docs = vec![Document::new("a", "first"), Document::new("b", "second")];
/// assert_eq!(
///     augment_query("why?", &docs),
///     "Context: first\nsecond\n\n\nQuery: why?",
/// );
/// ```
pub fn augment_query(query: &str, documents: &[Document]) -> String {
    let mut context = String::new();
    for doc in documents {
        context.push_str(doc.content().unwrap_or_default());
        context.push('\n');
    }
    format!("Context: {context}\n\nQuery: {query}")
}

/// A registry name plus the options handed to its constructor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendSpec {
    pub name: String,
    #[serde(default)]
    pub options: Value,
}

impl BackendSpec {
    pub fn new(name: impl Into<String>, options: Value) -> Self {
        Self { name: name.into(), options }
    }
}

/// Which backends [`RagOrchestrator::from_registries`] should construct.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendSelection {
    pub embedding: BackendSpec,
    /// Generation backend. Reuses the embedding provider when absent.
    #[serde(default)]
    pub generation: Option<BackendSpec>,
    pub store: BackendSpec,
}

/// The result of a full retrieve → augment → generate turn.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// The generated reply.
    pub text: String,
    /// The documents used as context, nearest first.
    pub documents: Vec<Document>,
}

/// The RAG orchestrator.
///
/// Stateless between calls. Construct one via [`RagOrchestrator::builder()`]
/// or [`RagOrchestrator::from_registries`].
pub struct RagOrchestrator {
    config: RagConfig,
    embedder: Arc<dyn Provider>,
    generator: Arc<dyn Provider>,
    store: Arc<dyn VectorStore>,
}

impl RagOrchestrator {
    /// Create a new [`RagOrchestratorBuilder`].
    pub fn builder() -> RagOrchestratorBuilder {
        RagOrchestratorBuilder::default()
    }

    /// Construct every component by name from the given registries.
    ///
    /// # Errors
    ///
    /// Propagates the registries' errors unchanged: unknown names, invalid
    /// options, and connection failures from the store constructor.
    pub async fn from_registries(
        providers: &ProviderRegistry,
        stores: &StoreRegistry,
        selection: BackendSelection,
        config: RagConfig,
    ) -> Result<Self> {
        let embedder = providers.create(&selection.embedding.name, selection.embedding.options).await?;
        let generator = match selection.generation {
            Some(spec) => providers.create(&spec.name, spec.options).await?,
            None => embedder.clone(),
        };
        let store = stores.create(&selection.store.name, selection.store.options).await?;

        Self::builder()
            .config(config)
            .embedding_provider(embedder)
            .generation_provider(generator)
            .vector_store(store)
            .build()
    }

    /// Return a reference to the orchestrator configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Embed `text` and store it. Returns the new document id.
    ///
    /// If the insert fails after a successful embed, the store error is
    /// returned; nothing is persisted and nothing is retried.
    #[instrument(name = "rag.ingest", skip_all, fields(text_len = text.len()))]
    pub async fn ingest(&self, ctx: &CallContext, text: &str) -> Result<DocumentId> {
        let embedding = ctx.run(self.embedder.embed(text)).await.map_err(|e| {
            error!(provider = self.embedder.name(), error = %e, "embedding failed during ingest");
            e
        })?;

        let id = ctx.run(self.store.insert(text, &embedding)).await.map_err(|e| {
            error!(store = self.store.name(), error = %e, "insert failed during ingest");
            e
        })?;

        info!(doc_id = %id, dimensions = embedding.len(), "ingested document");
        Ok(id)
    }

    /// Ingest several texts, embedding them in one batch.
    ///
    /// Inserts run in order and stop at the first failure; documents
    /// inserted before it stay stored.
    #[instrument(name = "rag.ingest_batch", skip_all, fields(count = texts.len()))]
    pub async fn ingest_batch(&self, ctx: &CallContext, texts: &[&str]) -> Result<Vec<DocumentId>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = ctx.run(self.embedder.embed_batch(texts)).await.map_err(|e| {
            error!(provider = self.embedder.name(), error = %e, "batch embedding failed");
            e
        })?;
        if embeddings.len() != texts.len() {
            return Err(RagError::provider(
                self.embedder.name(),
                format!("expected {} embeddings, got {}", texts.len(), embeddings.len()),
            ));
        }

        let mut ids = Vec::with_capacity(texts.len());
        for (text, embedding) in texts.iter().zip(&embeddings) {
            let id = ctx.run(self.store.insert(text, embedding)).await.map_err(|e| {
                error!(store = self.store.name(), inserted = ids.len(), error = %e, "batch insert failed");
                e
            })?;
            ids.push(id);
        }

        info!(count = ids.len(), "ingested batch");
        Ok(ids)
    }

    /// Embed `query` and return the nearest stored documents, closest first.
    ///
    /// Ordering and the result cap are the store's; nothing is filtered.
    #[instrument(name = "rag.retrieve", skip_all, fields(query_len = query.len()))]
    pub async fn retrieve(&self, ctx: &CallContext, query: &str) -> Result<Vec<Document>> {
        let embedding = ctx.run(self.embedder.embed(query)).await.map_err(|e| {
            error!(provider = self.embedder.name(), error = %e, "embedding failed during retrieve");
            e
        })?;

        let documents = ctx.run(self.store.query(&embedding)).await.map_err(|e| {
            error!(store = self.store.name(), error = %e, "vector store query failed");
            e
        })?;

        info!(result_count = documents.len(), "retrieved documents");
        Ok(documents)
    }

    /// Merge retrieved documents into the query. See [`augment_query`].
    pub fn augment(&self, query: &str, documents: &[Document]) -> String {
        augment_query(query, documents)
    }

    /// Build the generation prompt for an augmented query.
    pub fn build_prompt(&self, augmented: &str, parameters: Parameters) -> Prompt {
        Prompt::builder()
            .message(Role::System, &self.config.system_instruction)
            .message(Role::User, augmented)
            .parameters(parameters)
            .build()
    }

    /// Ask the generation provider to answer an augmented query.
    ///
    /// Returns the first choice's text. A provider that returns no choices
    /// yields a [`RagError::Provider`].
    #[instrument(name = "rag.generate", skip_all, fields(prompt_len = augmented.len()))]
    pub async fn generate(
        &self,
        ctx: &CallContext,
        augmented: &str,
        parameters: Parameters,
    ) -> Result<String> {
        let prompt = self.build_prompt(augmented, parameters);
        debug!(messages = prompt.messages().len(), "sending prompt");

        let text = ctx.run(self.generator.generate(&prompt)).await.map_err(|e| {
            error!(provider = self.generator.name(), error = %e, "generation failed");
            e
        })?;

        info!(answer_len = text.len(), "generated answer");
        Ok(text)
    }

    /// Run a full turn: retrieve, augment and generate.
    ///
    /// Uses the configured default parameters when `parameters` is `None`.
    #[instrument(name = "rag.answer", skip_all)]
    pub async fn answer(
        &self,
        ctx: &CallContext,
        query: &str,
        parameters: Option<Parameters>,
    ) -> Result<Answer> {
        let documents = self.retrieve(ctx, query).await?;
        let augmented = self.augment(query, &documents);
        let text =
            self.generate(ctx, &augmented, parameters.unwrap_or(self.config.parameters)).await?;
        Ok(Answer { text, documents })
    }

    /// Fetch a stored document by id.
    pub async fn find_by_id(&self, ctx: &CallContext, id: &str) -> Result<Document> {
        ctx.run(self.store.find_by_id(id)).await
    }

    /// Re-embed `text` and replace the document stored under `id`.
    ///
    /// The store performs a delete followed by a save; the document may be
    /// briefly absent to concurrent readers, and stays absent if the save
    /// fails. An embedding failure leaves the stored document untouched.
    #[instrument(name = "rag.update", skip_all, fields(doc_id = id))]
    pub async fn update(&self, ctx: &CallContext, id: &str, text: &str) -> Result<DocumentId> {
        let embedding = ctx.run(self.embedder.embed(text)).await.map_err(|e| {
            error!(provider = self.embedder.name(), error = %e, "embedding failed during update");
            e
        })?;
        let id = ctx.run(self.store.update(id, text, &embedding)).await.map_err(|e| {
            error!(store = self.store.name(), error = %e, "update failed");
            e
        })?;
        info!(doc_id = %id, "updated document");
        Ok(id)
    }

    /// Delete a stored document.
    pub async fn delete(&self, ctx: &CallContext, id: &str) -> Result<()> {
        ctx.run(self.store.delete(id)).await
    }

    /// Close the vector store's connections.
    pub async fn close(&self) {
        self.store.close().await;
    }
}

/// Builder for constructing a [`RagOrchestrator`].
///
/// The embedding provider and vector store are required. The generation
/// provider defaults to the embedding provider and the config to
/// [`RagConfig::default()`].
#[derive(Default)]
pub struct RagOrchestratorBuilder {
    config: Option<RagConfig>,
    embedder: Option<Arc<dyn Provider>>,
    generator: Option<Arc<dyn Provider>>,
    store: Option<Arc<dyn VectorStore>>,
}

impl RagOrchestratorBuilder {
    /// Set the orchestrator configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the provider used for embeddings.
    pub fn embedding_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.embedder = Some(provider);
        self
    }

    /// Set the provider used for generation.
    pub fn generation_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.generator = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the [`RagOrchestrator`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing or the
    /// config is invalid.
    pub fn build(self) -> Result<RagOrchestrator> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedder = self
            .embedder
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let store =
            self.store.ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let generator = self.generator.unwrap_or_else(|| embedder.clone());

        Ok(RagOrchestrator { config, embedder, generator, store })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory::InMemoryVectorStore;
    use crate::mock::MockProvider;

    fn orchestrator(provider: MockProvider) -> RagOrchestrator {
        RagOrchestrator::builder()
            .embedding_provider(Arc::new(provider))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn augment_joins_content_in_order() {
        let docs = vec![Document::new("1", "alpha"), Document::new("2", "beta")];
        assert_eq!(augment_query("q", &docs), "Context: alpha\nbeta\n\n\nQuery: q");
    }

    #[test]
    fn augment_with_no_documents_keeps_template() {
        assert_eq!(augment_query("q", &[]), "Context: \n\nQuery: q");
    }

    #[test]
    fn builder_requires_store() {
        let err = RagOrchestrator::builder()
            .embedding_provider(Arc::new(MockProvider::new(4)))
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("vector_store"));
    }

    #[test]
    fn build_prompt_places_system_first() {
        let rag = orchestrator(MockProvider::new(4));
        let prompt = rag.build_prompt("Context: x\n\nQuery: y", Parameters::default());
        assert_eq!(prompt.messages()[0].role, Role::System);
        assert_eq!(prompt.messages()[1].content, "Context: x\n\nQuery: y");
    }

    #[tokio::test]
    async fn failed_embed_stores_nothing() {
        let store = Arc::new(InMemoryVectorStore::new());
        let rag = RagOrchestrator::builder()
            .embedding_provider(Arc::new(MockProvider::new(4).failing_embed()))
            .vector_store(store.clone())
            .build()
            .unwrap();

        let err = rag.ingest(&CallContext::new(), "text").await.unwrap_err();
        assert!(matches!(err, RagError::Provider { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn generate_uses_separate_generation_provider() {
        let generator = Arc::new(MockProvider::new(4).with_reply("generated"));
        let rag = RagOrchestrator::builder()
            .embedding_provider(Arc::new(MockProvider::new(4).failing_generate()))
            .generation_provider(generator.clone())
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .build()
            .unwrap();

        let text = rag.generate(&CallContext::new(), "aug", Parameters::default()).await.unwrap();
        assert_eq!(text, "generated");
        assert_eq!(generator.prompts().len(), 1);
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let rag = orchestrator(MockProvider::new(4));
        assert!(rag.ingest_batch(&CallContext::new(), &[]).await.unwrap().is_empty());
    }
}
