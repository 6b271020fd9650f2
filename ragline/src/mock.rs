//! Deterministic provider for demos and tests.
//!
//! [`MockProvider`] needs no network access. Embeddings are derived from a
//! hash of the text's words, so texts sharing vocabulary land near each
//! other, and identical texts always produce identical vectors. Generation
//! returns a canned reply, or echoes the last user message.

use std::sync::Mutex;
use std::sync::PoisonError;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::document::Embedding;
use crate::error::{RagError, Result};
use crate::prompt::Prompt;
use crate::provider::Provider;
use crate::registry::parse_options;

/// Registry name of the mock provider.
pub const NAME: &str = "mock";

const DEFAULT_DIMENSIONS: usize = 64;

/// Options accepted by the `mock` registry entry.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MockConfig {
    #[serde(default)]
    pub dimensions: Option<usize>,
    /// Fixed generation reply. When unset the last user message is echoed.
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub fail_embed: bool,
    #[serde(default)]
    pub fail_generate: bool,
    /// Behave like a backend that answers with zero choices.
    #[serde(default)]
    pub empty_reply: bool,
}

/// A provider with hash-based embeddings and scripted replies.
#[derive(Debug)]
pub struct MockProvider {
    name: String,
    dimensions: usize,
    reply: Option<String>,
    fail_embed: bool,
    fail_generate: bool,
    empty_reply: bool,
    prompts: Mutex<Vec<Prompt>>,
}

impl MockProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            name: NAME.to_string(),
            dimensions,
            reply: None,
            fail_embed: false,
            fail_generate: false,
            empty_reply: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Build from registry options.
    pub fn from_options(options: Value) -> Result<Self> {
        let config: MockConfig = parse_options(NAME, options)?;
        let dimensions = config.dimensions.unwrap_or(DEFAULT_DIMENSIONS);
        if dimensions == 0 {
            return Err(RagError::invalid_option(NAME, "dimensions must be greater than zero"));
        }
        Ok(Self {
            reply: config.reply,
            fail_embed: config.fail_embed,
            fail_generate: config.fail_generate,
            empty_reply: config.empty_reply,
            ..Self::new(dimensions)
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// Make every `embed` call fail.
    pub fn failing_embed(mut self) -> Self {
        self.fail_embed = true;
        self
    }

    /// Make every `generate` call fail.
    pub fn failing_generate(mut self) -> Self {
        self.fail_generate = true;
        self
    }

    /// Simulate a backend response without any choices.
    pub fn with_empty_reply(mut self) -> Self {
        self.empty_reply = true;
        self
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Every prompt passed to `generate`, oldest first.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn hash_embedding(&self, text: &str) -> Embedding {
        let mut embedding = vec![0.0f32; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf2_9ce4_8422_2325u64, |acc, b| (acc ^ b as u64).wrapping_mul(0x100_0000_01b3));
            embedding[(hash % self.dimensions as u64) as usize] += 1.0;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        embedding
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        if self.fail_embed {
            return Err(RagError::provider(&self.name, "API returned no embeddings"));
        }
        debug!(provider = %self.name, text_len = text.len(), "embedding text");
        Ok(self.hash_embedding(text))
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).push(prompt.clone());

        if self.fail_generate {
            return Err(RagError::provider(&self.name, "generation failed"));
        }
        if self.empty_reply {
            return Err(RagError::provider(&self.name, "API returned no choices"));
        }

        Ok(match &self.reply {
            Some(reply) => reply.clone(),
            None => prompt.last_user_message().unwrap_or_default().to_string(),
        })
    }
}
