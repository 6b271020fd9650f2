//! OpenAI-compatible provider for embeddings and chat completions.
//!
//! This module is only available when the `openai` feature is enabled.
//!
//! Works against any server exposing `/v1/embeddings` and
//! `/v1/chat/completions` with bearer-token auth (OpenAI, vLLM, Ollama's
//! OpenAI shim, and so on).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::document::Embedding;
use crate::error::{RagError, Result};
use crate::prompt::{Message, Prompt};
use crate::provider::Provider;
use crate::registry::parse_options;

/// Registry name of the OpenAI provider.
pub const NAME: &str = "openai";

/// The default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Upper bound on every HTTP call, independent of the caller's deadline.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Options accepted by the `openai` registry entry.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OpenAIConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// # Errors
    ///
    /// Returns [`RagError::InvalidOption`] if the key or model is empty, the
    /// base URL is not http(s), or the timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(RagError::invalid_option(NAME, "api_key must not be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(RagError::invalid_option(NAME, "model must not be empty"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(RagError::invalid_option(
                NAME,
                format!("base_url must be an http(s) URL, got '{}'", self.base_url),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(RagError::invalid_option(NAME, "timeout_secs must be greater than zero"));
        }
        Ok(())
    }
}

/// A [`Provider`] backed by an OpenAI-compatible REST API.
///
/// One instance serves one model: use two instances when embedding and
/// generation use different models.
///
/// # Example
///
/// ```rust,ignore
/// use ragline::openai::{OpenAIConfig, OpenAIProvider};
///
/// let provider = OpenAIProvider::new(OpenAIConfig::new("sk-...", "text-embedding-3-small"))?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAIProvider {
    /// Create a provider from a validated config.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::provider(NAME, format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
        })
    }

    /// Build from registry options.
    pub fn from_options(options: Value) -> Result<Self> {
        Self::new(parse_options(NAME, options)?)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}{path}", self.base_url);

        let response =
            self.client.post(&url).bearer_auth(&self.api_key).json(body).send().await.map_err(
                |e| {
                    error!(provider = NAME, %url, error = %e, "request failed");
                    RagError::provider(NAME, format!("HTTP request failed: {e}"))
                },
            )?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(|e| {
                error!(provider = NAME, %status, %url, error = %e, "failed to read error body");
                RagError::provider(
                    NAME,
                    format!("API returned {status}; failed to read response body: {e}"),
                )
            })?;
            error!(provider = NAME, %status, %url, "API error");
            return Err(RagError::provider(NAME, format!("API returned {status}: {body}")));
        }

        response.json().await.map_err(|e| {
            error!(provider = NAME, error = %e, "failed to parse response");
            RagError::provider(NAME, format!("failed to decode response: {e}"))
        })
    }
}

// ── API request/response types ─────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a, I: Serialize> {
    model: &'a str,
    input: I,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ── Provider implementation ────────────────────────────────────────

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        debug!(provider = NAME, model = %self.model, text_len = text.len(), "embedding text");

        let response: EmbeddingResponse = self
            .post("/v1/embeddings", &EmbeddingRequest { model: &self.model, input: text })
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RagError::provider(NAME, "API returned no embeddings"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = NAME, model = %self.model, batch_size = texts.len(), "embedding batch");

        let response: EmbeddingResponse = self
            .post("/v1/embeddings", &EmbeddingRequest { model: &self.model, input: texts })
            .await?;

        if response.data.len() != texts.len() {
            return Err(RagError::provider(
                NAME,
                format!("expected {} embeddings, got {}", texts.len(), response.data.len()),
            ));
        }

        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let params = prompt.parameters();
        debug!(
            provider = NAME,
            model = %self.model,
            messages = prompt.messages().len(),
            max_tokens = params.max_tokens,
            "generating completion"
        );

        let request = ChatRequest {
            model: &self.model,
            messages: prompt.messages(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            frequency_penalty: params.frequency_penalty,
            presence_penalty: params.presence_penalty,
        };

        let response: ChatResponse = self.post("/v1/chat/completions", &request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RagError::provider(NAME, "API returned no choices"))?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn config_defaults_base_url_and_timeout() {
        let config: OpenAIConfig =
            parse_options(NAME, json!({ "api_key": "sk-test", "model": "gpt-4o-mini" })).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_api_key_is_invalid_option() {
        let err = OpenAIProvider::from_options(json!({ "model": "m" })).err().unwrap();
        assert!(matches!(err, RagError::InvalidOption { .. }));

        let err = OpenAIProvider::from_options(json!({ "api_key": "", "model": "m" })).err().unwrap();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn unknown_option_is_rejected() {
        let err = OpenAIProvider::from_options(json!({
            "api_key": "k",
            "model": "m",
            "organization": "org"
        }))
        .err()
        .unwrap();
        assert!(matches!(err, RagError::InvalidOption { .. }));
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let config = OpenAIConfig::new("k", "m").with_base_url("ftp://example.com");
        assert!(config.validate().is_err());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider =
            OpenAIProvider::new(OpenAIConfig::new("k", "m").with_base_url("http://localhost:8080/"))
                .unwrap();
        assert_eq!(provider.base_url, "http://localhost:8080");
    }
}
