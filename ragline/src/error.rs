//! Error types for the `ragline` crate.

use thiserror::Error;

/// Errors that can occur in RAG operations.
///
/// Variants fall into three groups: configuration (bad registry names, bad
/// adapter options), provider failures, and store failures. The orchestrator
/// never recovers from any of them; it logs and hands them back unchanged.
#[derive(Debug, Error)]
pub enum RagError {
    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No constructor is registered under the requested name.
    #[error("Unknown {kind} backend: '{name}'")]
    UnknownBackend {
        /// Which registry was searched (`provider` or `store`).
        kind: &'static str,
        /// The name that was looked up.
        name: String,
    },

    /// A constructor is already registered under this name.
    #[error("{kind} backend '{name}' is already registered")]
    AlreadyRegistered {
        /// Which registry rejected the registration.
        kind: &'static str,
        /// The conflicting name.
        name: String,
    },

    /// The options passed to a backend constructor were malformed.
    #[error("Invalid option for {backend}: {message}")]
    InvalidOption {
        /// The backend whose options were rejected.
        backend: String,
        /// A description of the problem.
        message: String,
    },

    /// An embedding or generation provider failed.
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// The provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector store backend failed.
    #[error("Vector store error ({backend}): {message}")]
    Store {
        /// The store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// No document exists with the given id.
    #[error("Document not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },

    /// The caller's deadline passed before the call completed.
    #[error("Deadline exceeded")]
    Timeout,

    /// The caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,
}

impl RagError {
    /// Returns `true` if this error means a document does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RagError::NotFound { .. })
    }

    /// Returns `true` for errors caused by setup rather than a failed call.
    ///
    /// These are not worth retrying: the same inputs fail the same way.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RagError::Config(_)
                | RagError::UnknownBackend { .. }
                | RagError::AlreadyRegistered { .. }
                | RagError::InvalidOption { .. }
        )
    }

    pub(crate) fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        RagError::Provider { provider: provider.into(), message: message.into() }
    }

    pub(crate) fn store(backend: impl Into<String>, message: impl Into<String>) -> Self {
        RagError::Store { backend: backend.into(), message: message.into() }
    }

    pub(crate) fn invalid_option(backend: impl Into<String>, message: impl Into<String>) -> Self {
        RagError::InvalidOption { backend: backend.into(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_configuration_errors() {
        assert!(RagError::Config("x".into()).is_configuration());
        assert!(RagError::UnknownBackend { kind: "store", name: "x".into() }.is_configuration());
        assert!(RagError::invalid_option("openai", "bad").is_configuration());
        assert!(!RagError::provider("openai", "boom").is_configuration());
        assert!(!RagError::Timeout.is_configuration());
    }

    #[test]
    fn not_found_is_distinct_from_store_failure() {
        assert!(RagError::NotFound { id: "abc".into() }.is_not_found());
        assert!(!RagError::store("pgvector", "connection refused").is_not_found());
    }

    #[test]
    fn display_includes_backend_names() {
        let err = RagError::UnknownBackend { kind: "provider", name: "cohere".into() };
        assert_eq!(err.to_string(), "Unknown provider backend: 'cohere'");
    }
}
