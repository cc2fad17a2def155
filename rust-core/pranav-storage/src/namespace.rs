// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Pranav contributors
//
// Namespace resolution.
//
// Every operation takes an optional namespace. An absent or empty namespace
// resolves to `DEFAULT_NAMESPACE`. Because a namespace names a physical unit
// (a file for the JSON store, a table for redb), names that could escape the
// storage directory are rejected up front.

use crate::error::{StorageError, StorageResult};

/// Namespace used when the caller does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Resolve an optional namespace to the name of its physical unit.
///
/// `None` and `Some("")` both yield [`DEFAULT_NAMESPACE`].
pub fn resolve(namespace: Option<&str>) -> StorageResult<&str> {
    let ns = match namespace {
        None | Some("") => return Ok(DEFAULT_NAMESPACE),
        Some(ns) => ns,
    };

    if ns == "." || ns == ".." || ns.contains(['/', '\\', '\0']) {
        return Err(StorageError::InvalidNamespace(ns.to_string()));
    }

    Ok(ns)
}
