// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Pranav contributors
//
// redb-backed embedded-database storage backend for Pranav.
//
// Uses redb (pure Rust, B-tree, ACID, single-file database) as the
// relational-style store: one table per namespace, literally named after the
// namespace, with `key` -> JSON text rows.
//
// # Design
//
// - The `Database` handle is opened lazily on first use and kept for the
//   lifetime of the instance; every namespace shares it.
// - One mutex per instance serializes all operations across all namespaces.
//   This is coarser than the JSON store's per-namespace locking and relies on
//   redb's transactional guarantees for durability.
// - Tables are created on demand, so the first touch of a new namespace never
//   fails for a missing table.
// - A clear-all drops every table in the database catalog, including
//   namespaces written by earlier processes, then recreates the default one.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, TableError, TableHandle,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::KeyValueStore;
use crate::error::{StorageError, StorageResult};
use crate::namespace::{self, DEFAULT_NAMESPACE};

/// Table definition for one namespace: entry key -> serialized JSON value.
fn namespace_table(namespace: &str) -> TableDefinition<'_, &'static str, &'static str> {
    TableDefinition::new(namespace)
}

fn unavailable<E: Display>(context: &'static str) -> impl FnOnce(E) -> StorageError {
    move |e| StorageError::BackendUnavailable(format!("{context}: {e}"))
}

fn corrupted<E: Display>(context: &'static str) -> impl FnOnce(E) -> StorageError {
    move |e| StorageError::CorruptedData(format!("{context}: {e}"))
}

/// A persistent storage backend powered by redb.
///
/// # Example
///
/// ```rust
/// use pranav_storage::backend::KeyValueStore;
/// use pranav_storage::redb_backend::RedbStore;
/// use serde_json::json;
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = RedbStore::new(dir.path().join("pranav.redb"));
/// store.initialize().unwrap();
///
/// store.store("counter", &json!(42), Some("sensors")).unwrap();
/// assert_eq!(store.list_keys(Some("sensors")).unwrap(), vec!["counter"]);
/// assert!(store.list_keys(None).unwrap().is_empty());
/// ```
pub struct RedbStore {
    /// Path to the database file.
    path: PathBuf,
    /// Lazily opened database; the mutex is the instance-wide lock.
    db: Mutex<Option<Database>>,
}

impl RedbStore {
    /// Create a store for the database file at `path`. The file is not
    /// opened until [`KeyValueStore::initialize`] or the first operation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            db: Mutex::new(None),
        }
    }

    /// Return the filesystem path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of every namespace table in the database catalog, sorted.
    pub fn namespaces(&self) -> StorageResult<Vec<String>> {
        self.with_db(|db| {
            let txn = db.begin_read().map_err(unavailable("read txn"))?;
            let mut names: Vec<String> = txn
                .list_tables()
                .map_err(unavailable("list tables"))?
                .map(|handle| handle.name().to_string())
                .collect();
            names.sort();
            Ok(names)
        })
    }

    /// Run `f` with the open database while holding the instance lock,
    /// opening the database first if needed.
    fn with_db<T>(&self, f: impl FnOnce(&Database) -> StorageResult<T>) -> StorageResult<T> {
        let mut guard = self
            .db
            .lock()
            .map_err(|_| StorageError::poisoned("database"))?;
        if guard.is_none() {
            *guard = Some(open_database(&self.path)?);
        }
        let db = guard
            .as_ref()
            .ok_or_else(|| StorageError::BackendUnavailable("database not open".to_string()))?;
        f(db)
    }
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .finish()
    }
}

impl KeyValueStore for RedbStore {
    fn initialize(&self) -> StorageResult<()> {
        self.with_db(|db| ensure_table(db, DEFAULT_NAMESPACE))
            .inspect(|_| debug!(path = %self.path.display(), "initialized redb storage"))
            .inspect_err(|e| {
                warn!(path = %self.path.display(), error = %e, "cannot initialize redb storage")
            })
    }

    fn store(&self, key: &str, value: &Value, namespace: Option<&str>) -> StorageResult<()> {
        let ns = namespace::resolve(namespace)?;
        let text = serde_json::to_string(value)?;

        self.with_db(|db| {
            let txn = db.begin_write().map_err(unavailable("write txn"))?;
            {
                let mut table = txn
                    .open_table(namespace_table(ns))
                    .map_err(unavailable("open table"))?;
                table
                    .insert(key, text.as_str())
                    .map_err(corrupted("insert"))?;
            }
            txn.commit().map_err(corrupted("commit"))
        })
        .inspect_err(|e| warn!(namespace = ns, key, error = %e, "failed to store value"))
    }

    fn retrieve(&self, key: &str, namespace: Option<&str>) -> StorageResult<Option<Value>> {
        let ns = namespace::resolve(namespace)?;

        let raw = self.with_db(|db| {
            let txn = db.begin_read().map_err(unavailable("read txn"))?;
            match txn.open_table(namespace_table(ns)) {
                Ok(table) => {
                    let found = table.get(key).map_err(corrupted("get"))?;
                    Ok(found.map(|guard| guard.value().to_string()))
                }
                Err(TableError::TableDoesNotExist(_)) => {
                    ensure_table(db, ns)?;
                    Ok(None)
                }
                Err(e) => Err(unavailable("open table")(e)),
            }
        })?;

        let Some(text) = raw else {
            return Ok(None);
        };
        match serde_json::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(namespace = ns, key, error = %e, "undecodable stored value, treating as absent");
                Ok(None)
            }
        }
    }

    fn delete(&self, key: &str, namespace: Option<&str>) -> StorageResult<()> {
        let ns = namespace::resolve(namespace)?;

        self.with_db(|db| {
            let txn = db.begin_write().map_err(unavailable("write txn"))?;
            {
                let mut table = txn
                    .open_table(namespace_table(ns))
                    .map_err(unavailable("open table"))?;
                table.remove(key).map_err(corrupted("remove"))?;
            }
            txn.commit().map_err(corrupted("commit"))
        })
        .inspect_err(|e| warn!(namespace = ns, key, error = %e, "failed to delete value"))
    }

    fn list_keys(&self, namespace: Option<&str>) -> StorageResult<Vec<String>> {
        let ns = namespace::resolve(namespace)?;

        self.with_db(|db| {
            let txn = db.begin_read().map_err(unavailable("read txn"))?;
            match txn.open_table(namespace_table(ns)) {
                Ok(table) => {
                    let mut keys = Vec::new();
                    for entry in table.iter().map_err(corrupted("iter"))? {
                        let (key, _) = entry.map_err(corrupted("iter entry"))?;
                        keys.push(key.value().to_string());
                    }
                    Ok(keys)
                }
                Err(TableError::TableDoesNotExist(_)) => {
                    ensure_table(db, ns)?;
                    Ok(Vec::new())
                }
                Err(e) => Err(unavailable("open table")(e)),
            }
        })
    }

    fn clear(&self, namespace: Option<&str>) -> StorageResult<()> {
        let target = namespace.map(|_| namespace::resolve(namespace)).transpose()?;

        self.with_db(|db| {
            let txn = db.begin_write().map_err(unavailable("write txn"))?;
            match target {
                Some(ns) => {
                    let mut table = txn
                        .open_table(namespace_table(ns))
                        .map_err(unavailable("open table"))?;
                    table.retain(|_, _| false).map_err(corrupted("retain"))?;
                }
                None => {
                    let tables: Vec<_> = txn
                        .list_tables()
                        .map_err(unavailable("list tables"))?
                        .collect();
                    for handle in tables {
                        let name = handle.name().to_string();
                        txn.delete_table(handle).map_err(corrupted("delete table"))?;
                        debug!(namespace = %name, "dropped namespace table");
                    }
                    txn.open_table(namespace_table(DEFAULT_NAMESPACE))
                        .map_err(unavailable("open table"))?;
                }
            }
            txn.commit().map_err(corrupted("commit"))
        })
        .inspect_err(|e| warn!(namespace = ?target, error = %e, "failed to clear storage"))
    }

    fn name(&self) -> &str {
        "redb"
    }
}

/// Open or create the database file, creating parent directories.
fn open_database(path: &Path) -> StorageResult<Database> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let db = Database::create(path).map_err(|e| {
        StorageError::BackendUnavailable(format!("failed to open redb at {}: {}", path.display(), e))
    })?;

    debug!(path = %path.display(), "opened redb database");
    Ok(db)
}

/// Create the namespace table if it does not exist yet.
fn ensure_table(db: &Database, namespace: &str) -> StorageResult<()> {
    let txn = db.begin_write().map_err(unavailable("write txn"))?;
    txn.open_table(namespace_table(namespace))
        .map_err(unavailable("open table"))?;
    txn.commit().map_err(corrupted("commit"))
}
