//! Provider trait for embedding and generation backends.

use async_trait::async_trait;

use crate::document::Embedding;
use crate::error::Result;
use crate::prompt::Prompt;

/// A backend that turns text into embeddings and prompts into answers.
///
/// Implementations wrap a specific service (an OpenAI-compatible HTTP API, a
/// local model server, a test double) behind one async interface. The
/// orchestrator only ever holds an `Arc<dyn Provider>`.
///
/// # Example
///
/// ```rust,ignore
/// use ragline::Provider;
///
/// let embedding = provider.embed("hello world").await?;
/// let answer = provider.generate(&prompt).await?;
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// A short name used in logs and errors.
    fn name(&self) -> &str;

    /// Generate an embedding for a single text.
    ///
    /// Fails if the backend returns no embedding.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for several texts, in input order.
    ///
    /// The default implementation calls [`embed`](Provider::embed)
    /// sequentially. Backends with native batching should override it.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Generate a reply to the prompt and return the first choice's text.
    ///
    /// Fails if the backend returns no choices.
    async fn generate(&self, prompt: &Prompt) -> Result<String>;
}
