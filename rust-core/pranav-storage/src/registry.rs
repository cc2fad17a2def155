// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Pranav contributors
//
// Storage backend registry.
//
// Maps a backend name to a constructor. A registry is an ordinary owned
// value: build one at startup with the built-in backends, hand it to
// whoever needs to create stores, and extend it with `register`. `create`
// only ever returns initialized handles.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::backend::{KeyValueStore, SharedStore};
use crate::config::BackendConfig;
use crate::error::{StorageError, StorageResult};
use crate::json_backend::JsonFileStore;
use crate::memory::InMemoryStore;

/// Registry name of the JSON flat-file backend.
pub const JSON_BACKEND: &str = "json";

/// Registry name of the redb embedded-database backend.
#[cfg(feature = "redb-backend")]
pub const REDB_BACKEND: &str = "redb";

/// Registry name of the in-memory backend.
pub const MEMORY_BACKEND: &str = "memory";

/// Builds an uninitialized backend from configuration.
pub type Constructor =
    Arc<dyn Fn(&BackendConfig) -> StorageResult<Box<dyn KeyValueStore>> + Send + Sync>;

/// Name -> constructor table used to select backends at runtime.
///
/// # Example
///
/// ```rust
/// use pranav_storage::backend::KeyValueStore;
/// use pranav_storage::config::BackendConfig;
/// use pranav_storage::registry::StorageRegistry;
/// use serde_json::json;
///
/// let dir = tempfile::tempdir().unwrap();
/// let registry = StorageRegistry::with_builtins();
/// let store = registry
///     .create("json", &BackendConfig::default().with_storage_dir(dir.path()))
///     .unwrap();
///
/// store.store("greeting", &json!("hi"), None).unwrap();
/// assert!(registry.create("nonexistent", &BackendConfig::default()).is_err());
/// ```
pub struct StorageRegistry {
    constructors: RwLock<BTreeMap<String, Constructor>>,
}

impl StorageRegistry {
    /// Create a registry with no backends.
    pub fn new() -> Self {
        Self {
            constructors: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a registry seeded with the built-in backends.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(JSON_BACKEND, |config: &BackendConfig| {
            Ok(Box::new(JsonFileStore::new(config.storage_dir())) as Box<dyn KeyValueStore>)
        });
        #[cfg(feature = "redb-backend")]
        registry.register(REDB_BACKEND, |config: &BackendConfig| {
            Ok(Box::new(crate::redb_backend::RedbStore::new(config.db_path()))
                as Box<dyn KeyValueStore>)
        });
        registry.register(MEMORY_BACKEND, |_: &BackendConfig| {
            Ok(Box::new(InMemoryStore::new()) as Box<dyn KeyValueStore>)
        });
        registry
    }

    /// Register `constructor` under `name`, replacing any previous entry.
    pub fn register<F>(&self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&BackendConfig) -> StorageResult<Box<dyn KeyValueStore>> + Send + Sync + 'static,
    {
        let name = name.into();
        let replaced = self
            .constructors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), Arc::new(constructor))
            .is_some();
        info!(backend = %name, replaced, "registered storage backend");
    }

    /// Construct and initialize the backend registered as `name`.
    ///
    /// Fails with [`StorageError::UnknownBackend`] for an unregistered name
    /// and [`StorageError::InitializationFailed`] when the backend cannot be
    /// built or cannot prepare its medium. A failed instance is dropped.
    pub fn create(&self, name: &str, config: &BackendConfig) -> StorageResult<SharedStore> {
        let constructor = self
            .constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();

        let Some(constructor) = constructor else {
            warn!(backend = name, "unknown storage backend");
            return Err(StorageError::UnknownBackend(name.to_string()));
        };

        let init_failed = |e: StorageError| {
            warn!(backend = name, error = %e, "failed to initialize storage backend");
            StorageError::InitializationFailed {
                backend: name.to_string(),
                reason: e.to_string(),
            }
        };

        let store = constructor(config).map_err(init_failed)?;
        store.initialize().map_err(init_failed)?;

        info!(backend = name, kind = store.name(), "created storage backend");
        Ok(Arc::from(store))
    }

    /// Snapshot of the registered backend names, sorted.
    pub fn available_names(&self) -> Vec<String> {
        self.constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Return true if a backend is registered under `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        self.constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

impl Default for StorageRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRegistry")
            .field("backends", &self.available_names())
            .finish()
    }
}
