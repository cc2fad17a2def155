// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Pranav contributors
//
// Storage error types for the Pranav storage layer.
//
// One error enum covers every failure a backend or the registry can report:
// medium errors (I/O, unavailable database), malformed persisted data,
// values that cannot be represented as JSON, bad namespace names, and
// registry lookups that produce no handle.

use thiserror::Error;

/// Result alias used throughout the storage crate.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur when interacting with a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred in the underlying storage medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be converted to or from its JSON representation.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Persisted data is corrupted or in an unexpected format.
    #[error("corrupted data: {0}")]
    CorruptedData(String),

    /// The storage medium cannot be reached (database not openable,
    /// transaction refused, lock poisoned).
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The namespace cannot be mapped onto a physical unit.
    #[error("invalid namespace: {0:?}")]
    InvalidNamespace(String),

    /// No backend is registered under the requested name.
    #[error("unknown storage backend: {0}")]
    UnknownBackend(String),

    /// A backend was constructed but could not prepare its medium.
    #[error("failed to initialize {backend} storage: {reason}")]
    InitializationFailed {
        /// Registry name of the backend.
        backend: String,
        /// Display form of the underlying failure.
        reason: String,
    },
}

impl StorageError {
    /// Build the error returned when a lock guarding backend state has been
    /// poisoned by a panicking thread.
    pub(crate) fn poisoned(what: &str) -> Self {
        StorageError::BackendUnavailable(format!("{what} lock poisoned"))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
