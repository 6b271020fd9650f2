//! Configuration for the RAG orchestrator.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::prompt::Parameters;

/// The system message sent ahead of every augmented query.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are an AI assistant. Use the available context \
     to answer the user's question as accurately as possible.";

/// Configuration parameters for [`RagOrchestrator`](crate::RagOrchestrator).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// System message placed before the augmented user message.
    pub system_instruction: String,
    /// Sampling parameters used by `answer` when the caller passes none.
    pub parameters: Parameters,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            parameters: Parameters::default(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the system instruction is blank or a
    /// parameter is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.system_instruction.trim().is_empty() {
            return Err(RagError::Config("system_instruction must not be empty".to_string()));
        }
        self.parameters.validate()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the system message.
    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.system_instruction = instruction.into();
        self
    }

    /// Set the default sampling parameters.
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.config.parameters = parameters;
        self
    }

    /// Set the maximum number of generated tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.parameters.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.parameters.temperature = temperature;
        self
    }

    /// Build the [`RagConfig`], validating every field.
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
