// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Pranav contributors
//! Backend construction settings.
//!
//! A single `BackendConfig` is handed to whichever constructor the registry
//! resolves; each backend reads only the fields it understands. The struct
//! deserializes with defaults so it can sit inside a caller's own config
//! file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default directory for the JSON document store.
pub const DEFAULT_STORAGE_DIR: &str = "data/storage";

/// Default database file for the redb store.
pub const DEFAULT_DB_PATH: &str = "data/storage/pranav.redb";

/// Construction-time configuration for storage backends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Directory holding one `<namespace>.json` file per namespace.
    pub storage_dir: Option<PathBuf>,
    /// Path of the embedded database file.
    pub db_path: Option<PathBuf>,
}

impl BackendConfig {
    /// Set the JSON store directory.
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    /// Set the database file path.
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    /// The configured storage directory, or [`DEFAULT_STORAGE_DIR`].
    pub fn storage_dir(&self) -> &Path {
        self.storage_dir
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_STORAGE_DIR))
    }

    /// The configured database path, or [`DEFAULT_DB_PATH`].
    pub fn db_path(&self) -> &Path {
        self.db_path
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_DB_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.storage_dir(), Path::new("data/storage"));
        assert_eq!(config.db_path(), Path::new("data/storage/pranav.redb"));
    }

    #[test]
    fn test_builders_override_defaults() {
        let config = BackendConfig::default()
            .with_storage_dir("/tmp/kv")
            .with_db_path("/tmp/kv/agent.redb");
        assert_eq!(config.storage_dir(), Path::new("/tmp/kv"));
        assert_eq!(config.db_path(), Path::new("/tmp/kv/agent.redb"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: BackendConfig =
            serde_json::from_str(r#"{"storage_dir": "memory/json"}"#).unwrap();
        assert_eq!(config.storage_dir(), Path::new("memory/json"));
        assert_eq!(config.db_path(), Path::new(DEFAULT_DB_PATH));

        let empty: BackendConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, BackendConfig::default());
    }
}
