//! Chat prompts passed to a generation provider.
//!
//! A [`Prompt`] is assembled with [`PromptBuilder`], which only appends.
//! Once built, the prompt is read-only.
//!
//! # Example
//!
//! ```rust
//! use ragline::{Parameters, Prompt, Role};
//!
//! let prompt = Prompt::builder()
//!     .message(Role::System, "Answer using the given context.")
//!     .message(Role::User, "Context: ...\n\nQuery: ...")
//!     .parameters(Parameters::default())
//!     .build();
//! assert_eq!(prompt.messages().len(), 2);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// The author of a chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Provider-agnostic sampling knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Parameters {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            max_tokens: 150,
            temperature: 0.7,
            top_p: 0.9,
            frequency_penalty: 0.5,
            presence_penalty: 0.6,
        }
    }
}

impl Parameters {
    /// Check every knob against the range OpenAI-compatible APIs accept.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] naming the first out-of-range field.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(RagError::Config("max_tokens must be greater than zero".into()));
        }
        check_range("temperature", self.temperature, 0.0, 2.0)?;
        check_range("top_p", self.top_p, 0.0, 1.0)?;
        check_range("frequency_penalty", self.frequency_penalty, -2.0, 2.0)?;
        check_range("presence_penalty", self.presence_penalty, -2.0, 2.0)?;
        Ok(())
    }
}

fn check_range(field: &str, value: f32, min: f32, max: f32) -> Result<()> {
    if !(min..=max).contains(&value) {
        return Err(RagError::Config(format!(
            "{field} ({value}) must be between {min} and {max}"
        )));
    }
    Ok(())
}

/// An ordered list of messages plus sampling parameters.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Prompt {
    messages: Vec<Message>,
    parameters: Parameters,
}

impl Prompt {
    /// Start an empty prompt with default parameters.
    pub fn builder() -> PromptBuilder {
        PromptBuilder::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// The content of the last `user` message, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages.iter().rev().find(|m| m.role == Role::User).map(|m| m.content.as_str())
    }
}

/// Append-only builder for [`Prompt`].
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    messages: Vec<Message>,
    parameters: Parameters,
}

impl PromptBuilder {
    /// Append a message.
    pub fn message(mut self, role: Role, content: impl Into<String>) -> Self {
        self.messages.push(Message { role, content: content.into() });
        self
    }

    /// Replace the sampling parameters.
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn build(self) -> Prompt {
        Prompt { messages: self.messages, parameters: self.parameters }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_message_order() {
        let prompt = Prompt::builder()
            .message(Role::System, "sys")
            .message(Role::User, "first")
            .message(Role::Assistant, "reply")
            .message(Role::User, "second")
            .build();

        let roles: Vec<Role> = prompt.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(prompt.last_user_message(), Some("second"));
    }

    #[test]
    fn roles_serialize_lowercase() {
        let msg = Message { role: Role::System, content: "x".into() };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
    }

    #[test]
    fn default_parameters_are_valid() {
        assert!(Parameters::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let params = Parameters { top_p: 1.5, ..Parameters::default() };
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("top_p"));

        let params = Parameters { max_tokens: 0, ..Parameters::default() };
        assert!(params.validate().is_err());
    }
}
