// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Pranav contributors
//
// In-memory storage backend for Pranav.
//
// Keeps every namespace in a `BTreeMap` inside one `RwLock`. Nothing is
// persisted; intended for tests, development, and ephemeral agent sessions.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::backend::KeyValueStore;
use crate::error::{StorageError, StorageResult};
use crate::namespace::{self, DEFAULT_NAMESPACE};

type Namespaces = HashMap<String, BTreeMap<String, Value>>;

/// An in-memory storage backend.
///
/// All data lives in process memory and is lost on drop. Clones share the
/// same state.
///
/// # Example
///
/// ```rust
/// use pranav_storage::backend::KeyValueStore;
/// use pranav_storage::memory::InMemoryStore;
/// use serde_json::json;
///
/// let store = InMemoryStore::new();
/// store.store("hello", &json!("world"), None).unwrap();
/// assert_eq!(store.retrieve("hello", None).unwrap(), Some(json!("world")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    /// Namespace name -> sorted entries, protected by a read-write lock.
    data: Arc<RwLock<Namespaces>>,
}

impl InMemoryStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the number of entries across all namespaces.
    pub fn len(&self) -> usize {
        self.data
            .read()
            .map(|data| data.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    /// Return true if no namespace holds any entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> StorageResult<std::sync::RwLockReadGuard<'_, Namespaces>> {
        self.data.read().map_err(|_| StorageError::poisoned("memory"))
    }

    fn write(&self) -> StorageResult<std::sync::RwLockWriteGuard<'_, Namespaces>> {
        self.data.write().map_err(|_| StorageError::poisoned("memory"))
    }
}

impl KeyValueStore for InMemoryStore {
    fn initialize(&self) -> StorageResult<()> {
        self.write()?
            .entry(DEFAULT_NAMESPACE.to_string())
            .or_default();
        Ok(())
    }

    fn store(&self, key: &str, value: &Value, namespace: Option<&str>) -> StorageResult<()> {
        let ns = namespace::resolve(namespace)?;
        self.write()?
            .entry(ns.to_string())
            .or_default()
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    fn retrieve(&self, key: &str, namespace: Option<&str>) -> StorageResult<Option<Value>> {
        let ns = namespace::resolve(namespace)?;
        Ok(self
            .read()?
            .get(ns)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn delete(&self, key: &str, namespace: Option<&str>) -> StorageResult<()> {
        let ns = namespace::resolve(namespace)?;
        if let Some(entries) = self.write()?.get_mut(ns) {
            entries.remove(key);
        }
        Ok(())
    }

    fn list_keys(&self, namespace: Option<&str>) -> StorageResult<Vec<String>> {
        let ns = namespace::resolve(namespace)?;
        Ok(self
            .read()?
            .get(ns)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn clear(&self, namespace: Option<&str>) -> StorageResult<()> {
        let mut data = self.write()?;
        match namespace {
            Some(_) => {
                let ns = namespace::resolve(namespace)?;
                data.entry(ns.to_string()).or_default().clear();
            }
            None => data.values_mut().for_each(BTreeMap::clear),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
