//! Persistence operations for the in-memory store
//!
//! This module handles serialization and file I/O for saving/loading the
//! in-memory store's databases to/from JSON files.

use std::{collections::HashMap, path::Path};

use serde::{Deserialize, Deserializer, Serialize};

use super::DatabaseMap;
use crate::{Error, Result, backend::errors::BackendError};

/// The current persistence file format version.
/// v0 indicates this is an unstable format subject to breaking changes.
const PERSISTENCE_VERSION: u8 = 0;

/// Helper to check if version is default (0) for serde skip_serializing_if
fn is_v0(v: &u8) -> bool {
    *v == 0
}

/// Validates the persistence version during deserialization.
fn validate_persistence_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != PERSISTENCE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported persistence version {version}; only version {PERSISTENCE_VERSION} is supported"
        )));
    }
    Ok(version)
}

/// On-disk shape of the store, as read back
#[derive(Deserialize)]
struct SerializableStore {
    /// File format version for compatibility checking
    #[serde(
        rename = "_v",
        default,
        deserialize_with = "validate_persistence_version"
    )]
    version: u8,
    #[serde(default)]
    databases: DatabaseMap,
}

/// On-disk shape of the store, as written
#[derive(Serialize)]
struct SnapshotRef<'a> {
    #[serde(rename = "_v", skip_serializing_if = "is_v0")]
    version: u8,
    databases: &'a DatabaseMap,
}

/// Writes `databases` to `path` as JSON.
pub(crate) async fn write_snapshot<P: AsRef<Path>>(databases: &DatabaseMap, path: P) -> Result<()> {
    let serializable = SnapshotRef {
        version: PERSISTENCE_VERSION,
        databases,
    };

    let json = serde_json::to_string_pretty(&serializable)
        .map_err(|e| -> Error { BackendError::SnapshotFailed { source: e }.into() })?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| -> Error { BackendError::FileIo { source: e }.into() })
}

/// Reads the databases stored at `path`.
///
/// A missing file yields no databases.
pub(crate) async fn read_snapshot<P: AsRef<Path>>(path: P) -> Result<DatabaseMap> {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => {
            let store: SerializableStore = serde_json::from_str(&json)
                .map_err(|e| -> Error { BackendError::SnapshotFailed { source: e }.into() })?;
            tracing::trace!(
                version = store.version,
                databases = store.databases.len(),
                "Read snapshot"
            );
            Ok(store.databases)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(BackendError::FileIo { source: e }.into()),
    }
}
