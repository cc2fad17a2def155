// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Pranav contributors
//
// Core storage contract for Pranav.
//
// Defines the `KeyValueStore` trait that every backend satisfies: a
// namespaced key-value interface over JSON values. Operations are
// synchronous and blocking; backends are shared across threads and choose
// their own locking granularity.

use std::fmt::Debug;
use std::sync::Arc;

use serde_json::Value;

use crate::error::StorageResult;

/// A pluggable, namespaced key-value storage backend.
///
/// Keys are strings, values are arbitrary JSON values. Every operation takes
/// an optional namespace; `None` resolves to
/// [`DEFAULT_NAMESPACE`](crate::namespace::DEFAULT_NAMESPACE). Namespaces are
/// fully isolated from one another.
///
/// Implementations are `Debug` so handles can be logged and inspected.
///
/// Failures never panic. Medium faults are logged by the backend and returned
/// as `Err`; unreadable persisted data is logged and treated as absent.
pub trait KeyValueStore: Debug + Send + Sync {
    /// Prepare the backing medium: directories, files, default table.
    ///
    /// An instance whose `initialize` failed must not be used.
    fn initialize(&self) -> StorageResult<()>;

    /// Insert or overwrite `key` in `namespace`. Other keys are untouched.
    fn store(&self, key: &str, value: &Value, namespace: Option<&str>) -> StorageResult<()>;

    /// Fetch the value for `key`.
    ///
    /// Returns `Ok(None)` when the key was never written or has been deleted.
    /// A stored JSON `null` comes back as `Ok(Some(Value::Null))`.
    fn retrieve(&self, key: &str, namespace: Option<&str>) -> StorageResult<Option<Value>>;

    /// Remove `key`. Removing a key that does not exist succeeds.
    fn delete(&self, key: &str, namespace: Option<&str>) -> StorageResult<()>;

    /// Keys currently present in `namespace`, in no particular order.
    ///
    /// A namespace that has never been written yields an empty list.
    fn list_keys(&self, namespace: Option<&str>) -> StorageResult<Vec<String>>;

    /// Empty one namespace, or with `None` every namespace this backend
    /// knows about. The exact reach of a clear-all is backend specific.
    fn clear(&self, namespace: Option<&str>) -> StorageResult<()>;

    /// A human-readable name for this backend, used in logging and metrics.
    fn name(&self) -> &str;
}

/// An initialized backend handle as handed out by the registry.
pub type SharedStore = Arc<dyn KeyValueStore>;

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn initialize(&self) -> StorageResult<()> {
        (**self).initialize()
    }

    fn store(&self, key: &str, value: &Value, namespace: Option<&str>) -> StorageResult<()> {
        (**self).store(key, value, namespace)
    }

    fn retrieve(&self, key: &str, namespace: Option<&str>) -> StorageResult<Option<Value>> {
        (**self).retrieve(key, namespace)
    }

    fn delete(&self, key: &str, namespace: Option<&str>) -> StorageResult<()> {
        (**self).delete(key, namespace)
    }

    fn list_keys(&self, namespace: Option<&str>) -> StorageResult<Vec<String>> {
        (**self).list_keys(namespace)
    }

    fn clear(&self, namespace: Option<&str>) -> StorageResult<()> {
        (**self).clear(namespace)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn initialize(&self) -> StorageResult<()> {
        (**self).initialize()
    }

    fn store(&self, key: &str, value: &Value, namespace: Option<&str>) -> StorageResult<()> {
        (**self).store(key, value, namespace)
    }

    fn retrieve(&self, key: &str, namespace: Option<&str>) -> StorageResult<Option<Value>> {
        (**self).retrieve(key, namespace)
    }

    fn delete(&self, key: &str, namespace: Option<&str>) -> StorageResult<()> {
        (**self).delete(key, namespace)
    }

    fn list_keys(&self, namespace: Option<&str>) -> StorageResult<Vec<String>> {
        (**self).list_keys(namespace)
    }

    fn clear(&self, namespace: Option<&str>) -> StorageResult<()> {
        (**self).clear(namespace)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
