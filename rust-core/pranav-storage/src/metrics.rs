// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Pranav contributors
//
// Metrics-collecting wrapper for Pranav storage backends.
//
// Wraps any `KeyValueStore` and transparently counts operations, retrieval
// hits and misses, failures, and cumulative latency.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use serde_json::Value;

use crate::backend::KeyValueStore;
use crate::error::StorageResult;

/// Accumulated statistics for a storage backend.
///
/// All counters are monotonically increasing until [`MetricsStore::reset_stats`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendStats {
    /// Number of `store` operations performed.
    pub store_count: u64,
    /// Number of `retrieve` operations performed.
    pub retrieve_count: u64,
    /// `retrieve` calls that found a value.
    pub hits: u64,
    /// `retrieve` calls that found nothing.
    pub misses: u64,
    /// Number of `delete` operations performed.
    pub delete_count: u64,
    /// Number of `list_keys` operations performed.
    pub list_count: u64,
    /// Number of `clear` operations performed.
    pub clear_count: u64,
    /// Operations of any kind that returned an error.
    pub error_count: u64,
    /// Cumulative wall-clock latency of all `store` calls, in milliseconds.
    pub store_latency_sum_ms: f64,
    /// Cumulative wall-clock latency of all `retrieve` calls, in milliseconds.
    pub retrieve_latency_sum_ms: f64,
}

/// A storage wrapper that collects operation metrics.
///
/// # Example
///
/// ```rust
/// use pranav_storage::backend::KeyValueStore;
/// use pranav_storage::memory::InMemoryStore;
/// use pranav_storage::metrics::MetricsStore;
/// use serde_json::json;
///
/// let metered = MetricsStore::new(InMemoryStore::new());
///
/// metered.store("key", &json!("value"), None).unwrap();
/// metered.retrieve("key", None).unwrap();
///
/// let stats = metered.stats();
/// assert_eq!(stats.store_count, 1);
/// assert_eq!(stats.hits, 1);
/// ```
#[derive(Debug)]
pub struct MetricsStore<S: KeyValueStore> {
    /// The wrapped backend that performs the actual storage operations.
    inner: S,
    /// Shared, mutable statistics accumulator.
    stats: Mutex<BackendStats>,
}

impl<S: KeyValueStore> MetricsStore<S> {
    /// Wrap `inner` with metrics collection.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            stats: Mutex::new(BackendStats::default()),
        }
    }

    /// Return a snapshot of the current statistics.
    pub fn stats(&self) -> BackendStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reset all statistics to zero.
    pub fn reset_stats(&self) {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner) = BackendStats::default();
    }

    /// Return a reference to the inner backend.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn record<T>(&self, result: &StorageResult<T>, update: impl FnOnce(&mut BackendStats)) {
        let mut s = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut s);
        if result.is_err() {
            s.error_count += 1;
        }
    }
}

impl<S: KeyValueStore> KeyValueStore for MetricsStore<S> {
    fn initialize(&self) -> StorageResult<()> {
        let result = self.inner.initialize();
        self.record(&result, |_| {});
        result
    }

    fn store(&self, key: &str, value: &Value, namespace: Option<&str>) -> StorageResult<()> {
        let start = Instant::now();
        let result = self.inner.store(key, value, namespace);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        self.record(&result, |s| {
            s.store_count += 1;
            s.store_latency_sum_ms += elapsed_ms;
        });
        result
    }

    fn retrieve(&self, key: &str, namespace: Option<&str>) -> StorageResult<Option<Value>> {
        let start = Instant::now();
        let result = self.inner.retrieve(key, namespace);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        self.record(&result, |s| {
            s.retrieve_count += 1;
            s.retrieve_latency_sum_ms += elapsed_ms;
            match &result {
                Ok(Some(_)) => s.hits += 1,
                Ok(None) => s.misses += 1,
                Err(_) => {}
            }
        });
        result
    }

    fn delete(&self, key: &str, namespace: Option<&str>) -> StorageResult<()> {
        let result = self.inner.delete(key, namespace);
        self.record(&result, |s| s.delete_count += 1);
        result
    }

    fn list_keys(&self, namespace: Option<&str>) -> StorageResult<Vec<String>> {
        let result = self.inner.list_keys(namespace);
        self.record(&result, |s| s.list_count += 1);
        result
    }

    fn clear(&self, namespace: Option<&str>) -> StorageResult<()> {
        let result = self.inner.clear(namespace);
        self.record(&result, |s| s.clear_count += 1);
        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
