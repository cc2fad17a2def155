// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Pranav contributors
//
// JSON flat-file storage backend for Pranav.
//
// Each namespace lives in `{storage_dir}/{namespace}.json`, a single JSON
// object mapping every key of the namespace to its value. Namespaces are
// loaded lazily into an in-process cache on first access and the whole file
// is rewritten after every mutation.
//
// # Locking
//
// One mutex per namespace, created on demand. The mutex spans the full
// load -> mutate -> persist sequence, so writers to the same namespace
// serialize while writers to different namespaces run in parallel. A second,
// short-lived mutex guards only the map of per-namespace slots.
//
// # Failure policy
//
// - A missing file is an empty namespace.
// - An unreadable or malformed file is logged and treated as empty; the next
//   successful write replaces it.
// - A failed write is reported to the caller, but the cache already holds
//   the attempted change.
//
// # Case
//
// Namespace names are case-sensitive, but two names differing only in ASCII
// case would share one file on macOS or Windows. Within one store the second
// such name is refused with `InvalidNamespace`; separate processes using
// both spellings on a case-insensitive filesystem are not detected.
//
// Rewriting the whole namespace on every mutation is meant for small
// documents (agent memory, preferences), not large datasets.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::backend::KeyValueStore;
use crate::error::{StorageError, StorageResult};
use crate::namespace::{self, DEFAULT_NAMESPACE};

/// File extension of namespace documents.
pub const NAMESPACE_EXTENSION: &str = "json";

/// In-memory image of one namespace file.
type Document = Map<String, Value>;

/// Per-namespace slot: `None` until the namespace file has been loaded.
type NamespaceSlot = Arc<Mutex<Option<Document>>>;

/// A persistent storage backend keeping one JSON document per namespace.
///
/// # Example
///
/// ```rust
/// use pranav_storage::backend::KeyValueStore;
/// use pranav_storage::json_backend::JsonFileStore;
/// use serde_json::json;
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = JsonFileStore::new(dir.path());
/// store.initialize().unwrap();
///
/// store.store("greeting", &json!("hi"), None).unwrap();
/// assert_eq!(store.retrieve("greeting", None).unwrap(), Some(json!("hi")));
/// ```
#[derive(Debug)]
pub struct JsonFileStore {
    /// Directory holding the namespace files.
    storage_dir: PathBuf,
    /// Namespace name -> cached document and its lock.
    slots: Mutex<HashMap<String, NamespaceSlot>>,
}

impl JsonFileStore {
    /// Create a store rooted at `storage_dir`. Nothing touches the disk until
    /// [`KeyValueStore::initialize`] or the first operation.
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the directory holding the namespace files.
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Path of the file backing `namespace`.
    pub fn namespace_path(&self, namespace: &str) -> PathBuf {
        self.storage_dir
            .join(format!("{namespace}.{NAMESPACE_EXTENSION}"))
    }

    /// Namespaces currently materialized in the cache, sorted.
    ///
    /// These are exactly the namespaces a clear-all will empty (together with
    /// the default namespace).
    pub fn cached_namespaces(&self) -> StorageResult<Vec<String>> {
        let slots = self.snapshot_slots()?;
        let mut names = Vec::with_capacity(slots.len());
        for (name, slot) in slots {
            let loaded = slot
                .lock()
                .map_err(|_| StorageError::poisoned("namespace"))?
                .is_some();
            if loaded {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Fetch or create the lock slot for `namespace`.
    ///
    /// A new namespace whose name differs only in ASCII case from one already
    /// open here is rejected: both would map to the same file on a
    /// case-insensitive filesystem.
    fn slot(&self, namespace: &str) -> StorageResult<NamespaceSlot> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| StorageError::poisoned("namespace registry"))?;
        if let Some(slot) = slots.get(namespace) {
            return Ok(Arc::clone(slot));
        }
        if let Some(existing) = slots.keys().find(|k| k.eq_ignore_ascii_case(namespace)) {
            warn!(namespace, existing = %existing, "namespace differs only in case from an open one");
            return Err(StorageError::InvalidNamespace(format!(
                "{namespace} collides with {existing}"
            )));
        }
        Ok(Arc::clone(slots.entry(namespace.to_string()).or_default()))
    }

    fn snapshot_slots(&self) -> StorageResult<Vec<(String, NamespaceSlot)>> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| StorageError::poisoned("namespace registry"))?;
        Ok(slots
            .iter()
            .map(|(name, slot)| (name.clone(), Arc::clone(slot)))
            .collect())
    }

    /// Run `f` against the loaded document of `namespace` while holding the
    /// namespace lock.
    fn with_namespace<T>(
        &self,
        namespace: &str,
        f: impl FnOnce(&Path, &mut Document) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let slot = self.slot(namespace)?;
        let mut cached = slot
            .lock()
            .map_err(|_| StorageError::poisoned("namespace"))?;
        let path = self.namespace_path(namespace);
        let document = cached.get_or_insert_with(|| load_document(&path, namespace));
        f(&path, document)
    }

    /// Replace the contents of `namespace` with an empty document on disk and
    /// in the cache.
    fn empty_namespace(&self, namespace: &str, slot: &NamespaceSlot) -> StorageResult<()> {
        let mut cached = slot
            .lock()
            .map_err(|_| StorageError::poisoned("namespace"))?;
        let document = cached.insert(Document::new());
        persist(&self.namespace_path(namespace), namespace, document)
    }
}

impl KeyValueStore for JsonFileStore {
    fn initialize(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.storage_dir).map_err(|e| {
            warn!(dir = %self.storage_dir.display(), error = %e, "cannot create storage directory");
            StorageError::Io(e)
        })?;
        debug!(dir = %self.storage_dir.display(), "initialized json storage");
        Ok(())
    }

    fn store(&self, key: &str, value: &Value, namespace: Option<&str>) -> StorageResult<()> {
        let ns = namespace::resolve(namespace)?;
        self.with_namespace(ns, |path, document| {
            document.insert(key.to_string(), value.clone());
            persist(path, ns, document)
        })
    }

    fn retrieve(&self, key: &str, namespace: Option<&str>) -> StorageResult<Option<Value>> {
        let ns = namespace::resolve(namespace)?;
        self.with_namespace(ns, |_, document| Ok(document.get(key).cloned()))
    }

    fn delete(&self, key: &str, namespace: Option<&str>) -> StorageResult<()> {
        let ns = namespace::resolve(namespace)?;
        self.with_namespace(ns, |path, document| {
            if document.remove(key).is_some() {
                persist(path, ns, document)
            } else {
                Ok(())
            }
        })
    }

    fn list_keys(&self, namespace: Option<&str>) -> StorageResult<Vec<String>> {
        let ns = namespace::resolve(namespace)?;
        self.with_namespace(ns, |_, document| Ok(document.keys().cloned().collect()))
    }

    fn clear(&self, namespace: Option<&str>) -> StorageResult<()> {
        if namespace.is_some() {
            let ns = namespace::resolve(namespace)?;
            let slot = self.slot(ns)?;
            return self.empty_namespace(ns, &slot);
        }

        // Clear-all reaches the default namespace plus whatever this instance
        // has touched; files never loaded here are left alone.
        let mut first_error = self.slot(DEFAULT_NAMESPACE).err();
        for (ns, slot) in self.snapshot_slots()? {
            if let Err(e) = self.empty_namespace(&ns, &slot) {
                warn!(namespace = %ns, error = %e, "failed to clear namespace");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "json"
    }
}

/// Read a namespace file, treating anything unreadable as an empty namespace.
fn load_document(path: &Path, namespace: &str) -> Document {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Document::new(),
        Err(e) => {
            warn!(namespace, path = %path.display(), error = %e, "cannot read namespace file, treating as empty");
            return Document::new();
        }
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(document)) => {
            debug!(namespace, keys = document.len(), "loaded namespace");
            document
        }
        Ok(_) => {
            warn!(namespace, path = %path.display(), "namespace file is not a JSON object, treating as empty");
            Document::new()
        }
        Err(e) => {
            warn!(namespace, path = %path.display(), error = %e, "malformed namespace file, treating as empty");
            Document::new()
        }
    }
}

/// Serialize `document` and atomically replace the namespace file.
fn persist(path: &Path, namespace: &str, document: &Document) -> StorageResult<()> {
    let bytes = serde_json::to_vec_pretty(document)?;
    atomic_write(path, &bytes).map_err(|e| {
        warn!(namespace, path = %path.display(), error = %e, "failed to persist namespace");
        StorageError::Io(e)
    })?;
    debug!(namespace, keys = document.len(), "persisted namespace");
    Ok(())
}

/// Write to a sibling temp file, fsync, then rename over the target so
/// readers only ever see the old or the new document.
fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::other("namespace path has no parent directory"))?;
    fs::create_dir_all(dir)?;

    let tmp = path.with_extension(format!("{NAMESPACE_EXTENSION}.tmp"));
    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    // Directory fsync makes the rename durable on POSIX; not all platforms
    // allow opening a directory.
    if let Ok(d) = File::open(dir) {
        let _ = d.sync_all();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn temp_store() -> (JsonFileStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("storage"));
        store.initialize().unwrap();
        (store, dir)
    }

    #[test]
    fn test_basic_crud() {
        let (store, _dir) = temp_store();

        assert_eq!(store.retrieve("counter", None).unwrap(), None);

        store.store("counter", &json!(42), None).unwrap();
        assert_eq!(store.retrieve("counter", None).unwrap(), Some(json!(42)));

        // Overwrite in place.
        store.store("counter", &json!(43), None).unwrap();
        assert_eq!(store.retrieve("counter", None).unwrap(), Some(json!(43)));
        assert_eq!(store.list_keys(None).unwrap(), vec!["counter".to_string()]);

        store.delete("counter", None).unwrap();
        assert_eq!(store.retrieve("counter", None).unwrap(), None);
        assert!(store.list_keys(None).unwrap().is_empty());

        // Deleting again is fine.
        store.delete("counter", None).unwrap();
    }

    #[test]
    fn test_null_is_distinct_from_absent() {
        let (store, _dir) = temp_store();
        store.store("nothing", &Value::Null, None).unwrap();
        assert_eq!(store.retrieve("nothing", None).unwrap(), Some(Value::Null));
    }

    #[test]
    fn test_namespace_file_layout() {
        let (store, _dir) = temp_store();
        store
            .store("user_name", &json!("Alice"), Some("users"))
            .unwrap();
        store
            .store("config", &json!({"debug": true, "log_level": "INFO"}), None)
            .unwrap();

        let users_path = store.storage_dir().join("users.json");
        let on_disk: Value = serde_json::from_slice(&fs::read(&users_path).unwrap()).unwrap();
        assert_eq!(on_disk, json!({"user_name": "Alice"}));

        let default_path = store.namespace_path(DEFAULT_NAMESPACE);
        let on_disk: Value = serde_json::from_slice(&fs::read(default_path).unwrap()).unwrap();
        assert_eq!(on_disk["config"]["log_level"], "INFO");

        // No temp files left behind.
        let leftovers: Vec<_> = fs::read_dir(store.storage_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_persistence_across_instances() {
        let dir = tempdir().unwrap();

        {
            let store = JsonFileStore::new(dir.path());
            store.initialize().unwrap();
            store.store("greeting", &json!("hi"), None).unwrap();
        }

        let store = JsonFileStore::new(dir.path());
        store.initialize().unwrap();
        assert_eq!(store.retrieve("greeting", None).unwrap(), Some(json!("hi")));
    }

    #[test]
    fn test_float_bits_survive_restart() {
        let dir = tempdir().unwrap();
        let value = f64::from_bits(0x305f_050c_368d_cc74);

        {
            let store = JsonFileStore::new(dir.path());
            store.initialize().unwrap();
            store.store("reading", &json!(value), Some("sensors")).unwrap();
        }

        let store = JsonFileStore::new(dir.path());
        let restored = store.retrieve("reading", Some("sensors")).unwrap().unwrap();
        assert_eq!(restored.as_f64().unwrap().to_bits(), value.to_bits());
    }

    #[test]
    fn test_delete_missing_key_writes_nothing() {
        let (store, _dir) = temp_store();
        store.delete("ghost", Some("empty")).unwrap();
        assert!(!store.namespace_path("empty").exists());
    }

    #[test]
    fn test_malformed_file_recovers_as_empty() {
        let (store, _dir) = temp_store();
        fs::write(store.namespace_path(DEFAULT_NAMESPACE), b"{not valid json").unwrap();

        assert_eq!(store.retrieve("anything", None).unwrap(), None);
        assert!(store.list_keys(None).unwrap().is_empty());

        // The next write replaces the corrupt file with a valid document.
        store.store("fresh", &json!(1), None).unwrap();
        let reopened = JsonFileStore::new(store.storage_dir());
        assert_eq!(reopened.retrieve("fresh", None).unwrap(), Some(json!(1)));
    }

    #[test]
    fn test_non_object_file_recovers_as_empty() {
        let (store, _dir) = temp_store();
        fs::write(store.namespace_path("list"), b"[1, 2, 3]").unwrap();
        assert!(store.list_keys(Some("list")).unwrap().is_empty());
    }

    #[test]
    fn test_clear_single_namespace() {
        let (store, _dir) = temp_store();
        store.store("x", &json!(1), Some("a")).unwrap();
        store.store("x", &json!(2), Some("b")).unwrap();

        store.clear(Some("a")).unwrap();
        assert!(store.list_keys(Some("a")).unwrap().is_empty());
        assert_eq!(store.retrieve("x", Some("b")).unwrap(), Some(json!(2)));

        // The cleared namespace still exists on disk, now empty.
        let on_disk: Value =
            serde_json::from_slice(&fs::read(store.namespace_path("a")).unwrap()).unwrap();
        assert_eq!(on_disk, json!({}));
    }

    #[test]
    fn test_clear_all_only_reaches_cached_namespaces() {
        let dir = tempdir().unwrap();

        {
            let writer = JsonFileStore::new(dir.path());
            writer.initialize().unwrap();
            writer.store("k", &json!("kept"), Some("untouched")).unwrap();
            writer.store("k", &json!("default"), None).unwrap();
        }

        let store = JsonFileStore::new(dir.path());
        store.store("k", &json!("gone"), Some("touched")).unwrap();
        assert_eq!(store.cached_namespaces().unwrap(), vec!["touched".to_string()]);

        store.clear(None).unwrap();
        assert!(store.list_keys(Some("touched")).unwrap().is_empty());
        assert!(store.list_keys(None).unwrap().is_empty());

        let fresh = JsonFileStore::new(dir.path());
        assert_eq!(
            fresh.retrieve("k", Some("untouched")).unwrap(),
            Some(json!("kept"))
        );
        assert_eq!(fresh.retrieve("k", None).unwrap(), None);
    }

    #[test]
    fn test_failed_persist_keeps_cache() {
        let dir = tempdir().unwrap();
        let storage_dir = dir.path().join("storage");
        let store = JsonFileStore::new(&storage_dir);
        store.initialize().unwrap();
        store.store("before", &json!(1), None).unwrap();

        // Replace the directory with a plain file so every write fails.
        fs::remove_dir_all(&storage_dir).unwrap();
        fs::write(&storage_dir, b"not a directory").unwrap();

        let err = store.store("after", &json!(2), None).unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
        assert_eq!(store.retrieve("after", None).unwrap(), Some(json!(2)));
    }

    #[test]
    fn test_initialize_fails_under_a_file() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file").unwrap();

        let store = JsonFileStore::new(blocker.join("storage"));
        assert!(store.initialize().is_err());
    }

    #[test]
    fn test_invalid_namespace_rejected() {
        let (store, _dir) = temp_store();
        let err = store.store("k", &json!(1), Some("../escape")).unwrap_err();
        assert!(matches!(err, StorageError::InvalidNamespace(_)));
        assert!(!store.storage_dir().join("../escape.json").exists());
    }

    #[test]
    fn test_case_colliding_namespace_rejected() {
        let (store, _dir) = temp_store();
        store.store("temperature", &json!(21), Some("Sensors")).unwrap();

        let err = store
            .store("temperature", &json!(99), Some("sensors"))
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidNamespace(_)));
        assert!(store.retrieve("x", Some("SENSORS")).is_err());

        // The original namespace is untouched.
        assert_eq!(
            store.retrieve("temperature", Some("Sensors")).unwrap(),
            Some(json!(21))
        );
    }

    #[test]
    fn test_concurrent_writers_lose_no_updates() {
        let (store, _dir) = temp_store();

        std::thread::scope(|scope| {
            for t in 0..4 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..10 {
                        store
                            .store(&format!("t{t}-k{i}"), &json!(i), Some("shared"))
                            .unwrap();
                    }
                });
            }
        });

        assert_eq!(store.list_keys(Some("shared")).unwrap().len(), 40);

        let reopened = JsonFileStore::new(store.storage_dir());
        assert_eq!(reopened.list_keys(Some("shared")).unwrap().len(), 40);
    }

    #[test]
    fn test_name() {
        let (store, _dir) = temp_store();
        assert_eq!(store.name(), "json");
    }
}
