// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Pranav contributors
//
// Pranav Storage
//
// A pluggable, namespaced key-value storage layer. Every backend implements
// the `KeyValueStore` contract (initialize, store, retrieve, delete,
// list_keys, clear), keys are partitioned into namespaces that map onto one
// physical unit each, and a `StorageRegistry` selects and initializes a
// backend by name at runtime.
//
// # Modules
//
// - [`backend`] -- The `KeyValueStore` trait defining the storage contract.
// - [`error`] -- The `StorageError` enum covering all failure modes.
// - [`namespace`] -- Resolution of optional namespaces to physical names.
// - [`config`] -- `BackendConfig`, the construction-time settings.
// - [`json_backend`] -- One JSON document per namespace, cached in process,
//   with per-namespace locking.
// - [`redb_backend`] -- One redb table per namespace in a single database
//   file, with an instance-wide lock.
// - [`memory`] -- An ephemeral in-memory backend.
// - [`registry`] -- Name -> constructor table and the `create` factory.
// - [`typed`] -- A serde-based typed view of one namespace.
// - [`metrics`] -- A transparent wrapper that collects operation statistics.
//
// # Example
//
// ```rust
// use pranav_storage::{BackendConfig, StorageRegistry};
// use serde_json::json;
//
// let dir = tempfile::tempdir().unwrap();
// let registry = StorageRegistry::with_builtins();
// let store = registry
//     .create("json", &BackendConfig::default().with_storage_dir(dir.path()))
//     .unwrap();
//
// store.store("user_name", &json!("Alice"), Some("users")).unwrap();
// assert_eq!(store.retrieve("user_name", Some("users")).unwrap(), Some(json!("Alice")));
// assert_eq!(store.retrieve("user_name", None).unwrap(), None);
// ```

pub mod backend;
pub mod config;
pub mod error;
pub mod json_backend;
pub mod memory;
pub mod metrics;
pub mod namespace;
pub mod registry;
pub mod typed;

// The embedded-database backend is on by default; disable `redb-backend` for
// a JSON-only build.
#[cfg(feature = "redb-backend")]
pub mod redb_backend;

// Re-export the most commonly used types at the crate root for convenience.
pub use backend::{KeyValueStore, SharedStore};
pub use config::BackendConfig;
pub use error::{StorageError, StorageResult};
pub use json_backend::JsonFileStore;
pub use memory::InMemoryStore;
pub use metrics::{BackendStats, MetricsStore};
pub use namespace::DEFAULT_NAMESPACE;
pub use registry::StorageRegistry;
pub use typed::TypedStore;

#[cfg(feature = "redb-backend")]
pub use redb_backend::RedbStore;
