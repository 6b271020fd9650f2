//! # ragline
//!
//! Retrieval-augmented generation with pluggable backends.
//!
//! ## Overview
//!
//! - [`Provider`] - embeds text and generates answers
//! - [`VectorStore`] - persists documents and answers nearest-neighbour queries
//! - [`ProviderRegistry`] / [`StoreRegistry`] - construct backends by name
//! - [`RagOrchestrator`] - ingest, retrieve, augment and generate
//!
//! Built-in backends:
//!
//! | name | kind | feature |
//! |------|------|---------|
//! | `mock` | provider | always |
//! | `openai` | provider | `openai` (default) |
//! | `memory` | store | always |
//! | `pgvector` | store | `pgvector` |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ragline::{
//!     BackendSelection, BackendSpec, CallContext, ProviderRegistry, RagConfig,
//!     RagOrchestrator, StoreRegistry,
//! };
//! use serde_json::json;
//!
//! let rag = RagOrchestrator::from_registries(
//!     &ProviderRegistry::with_defaults(),
//!     &StoreRegistry::with_defaults(),
//!     BackendSelection {
//!         embedding: BackendSpec::new("openai", json!({ "api_key": key, "model": "text-embedding-3-small" })),
//!         generation: Some(BackendSpec::new("openai", json!({ "api_key": key, "model": "gpt-4o-mini" }))),
//!         store: BackendSpec::new("pgvector", json!({ "dsn": dsn })),
//!     },
//!     RagConfig::default(),
//! )
//! .await?;
//!
//! let ctx = CallContext::new();
//! rag.ingest(&ctx, "Indonesia declared independence on 17 August 1945.").await?;
//! let answer = rag.answer(&ctx, "When is Indonesia's independence day?", None).await?;
//! println!("{}", answer.text);
//! ```

pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod inmemory;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;
pub mod orchestrator;
#[cfg(feature = "pgvector")]
pub mod pgvector;
pub mod prompt;
pub mod provider;
pub mod registry;
pub mod store;

pub use config::{DEFAULT_SYSTEM_INSTRUCTION, RagConfig, RagConfigBuilder};
pub use context::CallContext;
pub use document::{CONTENT_KEY, Document, DocumentId, Embedding};
pub use error::{RagError, Result};
pub use inmemory::{InMemoryConfig, InMemoryVectorStore};
pub use mock::{MockConfig, MockProvider};
#[cfg(feature = "openai")]
pub use openai::{OpenAIConfig, OpenAIProvider};
pub use orchestrator::{
    Answer, BackendSelection, BackendSpec, RagOrchestrator, RagOrchestratorBuilder, augment_query,
};
#[cfg(feature = "pgvector")]
pub use pgvector::{PgVectorConfig, PgVectorStore};
pub use prompt::{Message, Parameters, Prompt, PromptBuilder, Role};
pub use provider::Provider;
pub use registry::{ProviderRegistry, Registry, StoreRegistry};
pub use store::{DEFAULT_RESULT_LIMIT, VectorStore};
