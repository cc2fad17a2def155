// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Pranav contributors
//
// Typed storage wrapper for Pranav.
//
// Binds any `KeyValueStore` to one namespace and converts Rust values to and
// from JSON with serde. Values that have no JSON representation are refused
// before anything reaches the backend.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::backend::KeyValueStore;
use crate::error::{StorageError, StorageResult};

/// A typed view of one namespace of a [`KeyValueStore`].
///
/// # Example
///
/// ```rust
/// use pranav_storage::memory::InMemoryStore;
/// use pranav_storage::typed::TypedStore;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Serialize, Deserialize, PartialEq)]
/// struct User { name: String, age: u32 }
///
/// let store = TypedStore::new(InMemoryStore::new(), "users");
///
/// let alice = User { name: "Alice".into(), age: 30 };
/// store.put("alice", &alice).unwrap();
///
/// let retrieved: User = store.get("alice").unwrap().unwrap();
/// assert_eq!(retrieved, alice);
/// ```
pub struct TypedStore<S: KeyValueStore> {
    /// The underlying backend.
    backend: S,
    /// Namespace every operation is scoped to.
    namespace: String,
}

impl<S: KeyValueStore> TypedStore<S> {
    /// Create a typed store over `namespace` of `backend`.
    pub fn new(backend: S, namespace: &str) -> Self {
        Self {
            backend,
            namespace: namespace.to_string(),
        }
    }

    /// Return a reference to the underlying backend.
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Return the namespace this store is bound to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Retrieve and deserialize a value.
    ///
    /// Returns `Ok(None)` if the key does not exist, and a serialization
    /// error if the stored value does not have the shape of `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.backend.retrieve(key, Some(self.namespace.as_str()))? {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|err| {
                StorageError::Serialization(format!(
                    "failed to deserialize value for key '{key}': {err}"
                ))
            }),
            None => Ok(None),
        }
    }

    /// Serialize and store a value.
    pub fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let value = serde_json::to_value(value).map_err(|err| {
            StorageError::Serialization(format!(
                "failed to serialize value for key '{key}': {err}"
            ))
        })?;
        self.backend.store(key, &value, Some(self.namespace.as_str()))
    }

    /// Delete a value. Deleting a missing key succeeds.
    pub fn delete(&self, key: &str) -> StorageResult<()> {
        self.backend.delete(key, Some(self.namespace.as_str()))
    }

    /// Keys present in this namespace.
    pub fn keys(&self) -> StorageResult<Vec<String>> {
        self.backend.list_keys(Some(self.namespace.as_str()))
    }

    /// Empty this namespace.
    pub fn clear(&self) -> StorageResult<()> {
        self.backend.clear(Some(self.namespace.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestRecord {
        name: String,
        score: f64,
    }

    #[test]
    fn test_typed_round_trip() {
        let store = TypedStore::new(InMemoryStore::new(), "test");

        let record = TestRecord {
            name: "Alice".to_string(),
            score: 95.5,
        };

        store.put("rec1", &record).unwrap();
        let retrieved: TestRecord = store.get("rec1").unwrap().unwrap();
        assert_eq!(retrieved, record);

        // Missing key.
        let missing: Option<TestRecord> = store.get("nonexistent").unwrap();
        assert!(missing.is_none());

        store.delete("rec1").unwrap();
        assert!(store.get::<TestRecord>("rec1").unwrap().is_none());
        store.delete("rec1").unwrap();
    }

    #[test]
    fn test_namespace_isolation() {
        let backend = InMemoryStore::new();
        let store_a = TypedStore::new(backend.clone(), "ns_a");
        let store_b = TypedStore::new(backend.clone(), "ns_b");

        store_a.put("key", "value_a").unwrap();
        store_b.put("key", "value_b").unwrap();

        assert_eq!(store_a.get::<String>("key").unwrap().unwrap(), "value_a");
        assert_eq!(store_b.get::<String>("key").unwrap().unwrap(), "value_b");

        store_a.clear().unwrap();
        assert!(store_a.keys().unwrap().is_empty());
        assert_eq!(store_b.keys().unwrap(), vec!["key"]);

        // The raw backend sees the same data under the namespace.
        assert_eq!(
            backend.retrieve("key", Some("ns_b")).unwrap(),
            Some(json!("value_b"))
        );
    }

    #[test]
    fn test_unserializable_value_is_refused() {
        let store = TypedStore::new(InMemoryStore::new(), "bad");

        // JSON object keys must be strings.
        let mut map = BTreeMap::new();
        map.insert(vec![1u8, 2], "tuple-keyed");

        let err = store.put("map", &map).unwrap_err();
        match err {
            StorageError::Serialization(msg) => assert!(msg.contains("failed to serialize")),
            other => panic!("expected Serialization, got: {:?}", other),
        }
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_shape_mismatch_is_serialization_error() {
        let backend = InMemoryStore::new();
        let store = TypedStore::new(backend.clone(), "bad");

        backend
            .store("broken", &json!("just a string"), Some("bad"))
            .unwrap();

        let result = store.get::<TestRecord>("broken");
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_accessors() {
        let store = TypedStore::new(InMemoryStore::new(), "myns");
        assert_eq!(store.namespace(), "myns");
        assert_eq!(store.backend().name(), "in-memory");
    }
}
