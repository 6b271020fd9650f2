//! Name-based registries for providers and vector stores.
//!
//! A [`Registry`] maps a backend name to an async constructor. Each
//! constructor receives a JSON object of options, deserialises it into the
//! adapter's own typed config and validates it before building an instance.
//!
//! Registries are plain values: build one at startup, register backends on
//! it, and hand it to [`RagOrchestrator::from_registries`](crate::RagOrchestrator::from_registries).
//!
//! # Example
//!
//! ```rust,ignore
//! use ragline::{ProviderRegistry, StoreRegistry};
//! use serde_json::json;
//!
//! let providers = ProviderRegistry::with_defaults();
//! let stores = StoreRegistry::with_defaults();
//!
//! let provider = providers.create("mock", json!({ "dimensions": 8 })).await?;
//! let store = stores.create("memory", json!({ "result_limit": 3 })).await?;
//! ```

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{RagError, Result};
use crate::inmemory::{self, InMemoryVectorStore};
use crate::mock::{self, MockProvider};
use crate::provider::Provider;
use crate::store::VectorStore;

/// A boxed async constructor stored in a [`Registry`].
pub type Constructor<T> = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Arc<T>>> + Send + Sync>;

/// Registry of embedding/generation providers.
pub type ProviderRegistry = Registry<dyn Provider>;

/// Registry of vector stores.
pub type StoreRegistry = Registry<dyn VectorStore>;

/// A name → constructor map guarded by a single read/write lock.
///
/// The lock covers only the map. [`create`](Registry::create) releases it
/// before running the constructor, so construction of different backends
/// proceeds in parallel.
pub struct Registry<T: ?Sized> {
    kind: &'static str,
    constructors: RwLock<HashMap<String, Constructor<T>>>,
}

impl<T: ?Sized + Send + Sync + 'static> Registry<T> {
    fn with_kind(kind: &'static str) -> Self {
        Self { kind, constructors: RwLock::new(HashMap::new()) }
    }

    /// Register a constructor under `name`.
    ///
    /// # Errors
    ///
    /// - [`RagError::AlreadyRegistered`] if `name` is taken. The existing
    ///   registration is left untouched.
    /// - [`RagError::Config`] if `name` is empty.
    pub fn register<F, Fut>(&self, name: impl Into<String>, constructor: F) -> Result<()>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<T>>> + Send + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RagError::Config(format!("{} name must not be empty", self.kind)));
        }

        let mut constructors = self.constructors.write().unwrap_or_else(PoisonError::into_inner);
        match constructors.entry(name) {
            Entry::Occupied(entry) => {
                Err(RagError::AlreadyRegistered { kind: self.kind, name: entry.key().clone() })
            }
            Entry::Vacant(entry) => {
                debug!(kind = self.kind, name = %entry.key(), "registered backend");
                entry.insert(boxed(constructor));
                Ok(())
            }
        }
    }

    /// Construct the backend registered under `name` with the given options.
    ///
    /// `options` is a JSON object (or `null` for all defaults).
    ///
    /// # Errors
    ///
    /// - [`RagError::UnknownBackend`] if nothing is registered under `name`;
    ///   no constructor runs.
    /// - Whatever the constructor returns, typically
    ///   [`RagError::InvalidOption`] for malformed options.
    pub async fn create(&self, name: &str, options: Value) -> Result<Arc<T>> {
        let constructor = {
            let constructors = self.constructors.read().unwrap_or_else(PoisonError::into_inner);
            constructors.get(name).cloned()
        };
        let constructor = constructor
            .ok_or_else(|| RagError::UnknownBackend { kind: self.kind, name: name.to_string() })?;

        debug!(kind = self.kind, name, "creating backend");
        constructor(options).await
    }

    /// Returns `true` if a constructor is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.read().unwrap_or_else(PoisonError::into_inner).contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.constructors.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect();
        names.sort();
        names
    }

    // Built-in names are distinct constants, so this skips the duplicate check.
    fn install<F, Fut>(self, name: &str, constructor: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<T>>> + Send + 'static,
    {
        self.constructors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), boxed(constructor));
        self
    }
}

fn boxed<T, F, Fut>(constructor: F) -> Constructor<T>
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Arc<T>>> + Send + 'static,
{
    Arc::new(move |options: Value| constructor(options).boxed())
}

impl Registry<dyn Provider> {
    /// An empty provider registry.
    pub fn new() -> Self {
        Self::with_kind("provider")
    }

    /// A provider registry with the built-in providers registered:
    /// `mock`, plus `openai` when that feature is enabled.
    pub fn with_defaults() -> Self {
        let registry = Self::new().install(mock::NAME, |options| async move {
            Ok(Arc::new(MockProvider::from_options(options)?) as Arc<dyn Provider>)
        });

        #[cfg(feature = "openai")]
        let registry = registry.install(crate::openai::NAME, |options| async move {
            Ok(Arc::new(crate::openai::OpenAIProvider::from_options(options)?) as Arc<dyn Provider>)
        });

        registry
    }
}

impl Default for Registry<dyn Provider> {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry<dyn VectorStore> {
    /// An empty store registry.
    pub fn new() -> Self {
        Self::with_kind("store")
    }

    /// A store registry with the built-in stores registered:
    /// `memory`, plus `pgvector` when that feature is enabled.
    pub fn with_defaults() -> Self {
        let registry = Self::new().install(inmemory::NAME, |options| async move {
            Ok(Arc::new(InMemoryVectorStore::from_options(options)?) as Arc<dyn VectorStore>)
        });

        #[cfg(feature = "pgvector")]
        let registry = registry.install(crate::pgvector::NAME, |options| async move {
            let store = crate::pgvector::PgVectorStore::from_options(options).await?;
            Ok(Arc::new(store) as Arc<dyn VectorStore>)
        });

        registry
    }
}

impl Default for Registry<dyn VectorStore> {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserialise constructor options into an adapter's config type.
///
/// `null` is treated as an empty object so every field takes its default.
pub fn parse_options<C: DeserializeOwned>(backend: &str, options: Value) -> Result<C> {
    let options = if options.is_null() { Value::Object(Default::default()) } else { options };
    serde_json::from_value(options).map_err(|e| RagError::invalid_option(backend, e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn second_registration_is_rejected_and_first_survives() {
        let registry = ProviderRegistry::new();
        registry
            .register("local", |_| async {
                Ok(Arc::new(MockProvider::new(4).with_name("first")) as Arc<dyn Provider>)
            })
            .unwrap();

        let err = registry
            .register("local", |_| async {
                Ok(Arc::new(MockProvider::new(4).with_name("second")) as Arc<dyn Provider>)
            })
            .unwrap_err();
        assert!(matches!(err, RagError::AlreadyRegistered { kind: "provider", .. }));

        let provider = registry.create("local", Value::Null).await.unwrap();
        assert_eq!(provider.name(), "first");
    }

    #[tokio::test]
    async fn unknown_name_never_runs_a_constructor() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = StoreRegistry::new();
        let counter = calls.clone();
        registry
            .register("memory", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(Arc::new(InMemoryVectorStore::new()) as Arc<dyn VectorStore>) }
            })
            .unwrap();

        let err = registry.create("pgvector", Value::Null).await.err().unwrap();
        assert!(matches!(err, RagError::UnknownBackend { kind: "store", .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_name_is_rejected() {
        let registry = StoreRegistry::new();
        let err = registry
            .register("  ", |_| async {
                Ok(Arc::new(InMemoryVectorStore::new()) as Arc<dyn VectorStore>)
            })
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(registry.names().is_empty());
    }

    #[tokio::test]
    async fn malformed_options_are_distinct_from_unknown_name() {
        let registry = StoreRegistry::with_defaults();
        let err = registry.create("memory", json!({ "no_such_field": 1 })).await.err().unwrap();
        assert!(matches!(err, RagError::InvalidOption { .. }));
    }

    #[test]
    fn defaults_list_built_in_backends() {
        let providers = ProviderRegistry::with_defaults();
        assert!(providers.contains("mock"));
        #[cfg(feature = "openai")]
        assert!(providers.contains("openai"));

        let stores = StoreRegistry::with_defaults();
        assert!(stores.names().contains(&"memory".to_string()));
    }

    #[test]
    fn null_options_use_defaults() {
        #[derive(serde::Deserialize)]
        struct Opts {
            #[serde(default)]
            limit: usize,
        }
        let opts: Opts = parse_options("test", Value::Null).unwrap();
        assert_eq!(opts.limit, 0);
    }
}
