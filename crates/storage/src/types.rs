//! Common types used across storage operations.
//!
//! This module defines the flat [`Record`] entry, the [`OwnerId`] partition
//! key, and the raw [`KeyValue`] pair returned by backend range queries.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::ValidationError, path};

/// Key-value pair returned from range queries.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use cloudfiles_storage::KeyValue;
///
/// let kv = KeyValue::new(Bytes::from("key"), Bytes::from("value"));
/// assert_eq!(kv.key, Bytes::from("key"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// The key identifying this entry.
    pub key: Bytes,

    /// The value stored at this key.
    pub value: Bytes,
}

impl KeyValue {
    /// Creates a new key-value pair.
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }
}

/// Identity that owns a namespace of records.
///
/// The owner is the partition key of the record store: every read and
/// write is scoped to exactly one owner. In practice it is the `sub` claim
/// of a verified bearer token.
///
/// Owners are non-empty and contain neither `/` nor NUL, because both
/// characters are used as separators in storage and object keys.
///
/// # Examples
///
/// ```
/// use cloudfiles_storage::OwnerId;
///
/// let owner = OwnerId::new("3f1c9a52-user").unwrap();
/// assert_eq!(owner.as_str(), "3f1c9a52-user");
///
/// assert!(OwnerId::new("").is_err());
/// assert!(OwnerId::new("a/b").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Validates and wraps an owner identity.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the identity is empty or contains
    /// `/` or NUL.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::new("owner identity is empty"));
        }
        if id.contains('/') || id.contains('\0') {
            return Err(ValidationError::new(format!(
                "owner identity '{}' contains a reserved character",
                id.escape_debug()
            )));
        }
        Ok(Self(id))
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OwnerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One entry in the flat record store.
///
/// A record is keyed by `(owner, path)`; at most one record exists per key.
/// Folder records have a path ending in `/` and size 0. File records never
/// end in `/`.
///
/// The serialized field names match the stored wire shape:
///
/// ```json
/// {
///   "owner_id": "3f1c9a52-user",
///   "file_path": "photos/2024/",
///   "filename": "2024",
///   "is_folder": true,
///   "size": 0,
///   "created_at": "2024-05-01T12:00:00Z"
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Partition key: the identity owning this record.
    #[serde(rename = "owner_id")]
    pub owner: OwnerId,

    /// Sort key: `/`-separated path relative to the owner's root.
    #[serde(rename = "file_path")]
    pub path: String,

    /// Last non-empty path segment.
    #[serde(rename = "filename")]
    pub name: String,

    /// Whether this record represents a folder.
    pub is_folder: bool,

    /// Object size in bytes (0 for folders).
    pub size: u64,

    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl Record {
    /// Builds a folder record from an already-canonical folder path.
    ///
    /// The path is expected to come from
    /// [`normalize_folder_path`](crate::path::normalize_folder_path).
    #[must_use]
    pub fn folder(owner: OwnerId, folder: path::FolderPath, created_at: DateTime<Utc>) -> Self {
        let (path, name) = folder.into_parts();
        Self { owner, path, name, is_folder: true, size: 0, created_at }
    }

    /// Builds a file record for `path`, deriving the name from its last segment.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if `path` is not a canonical file path;
    /// in particular a path ending in `/` is reserved for folder records.
    pub fn file(
        owner: OwnerId,
        path: impl Into<String>,
        size: u64,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let path = path.into();
        let file_path = path::validate_file_path(&path)?;
        let name = path::last_segment(file_path).unwrap_or_default().to_owned();
        Ok(Self { owner, path, name, is_folder: false, size, created_at })
    }

    /// Number of non-empty `/`-separated segments in this record's path.
    #[must_use]
    pub fn depth(&self) -> usize {
        path::depth(&self.path)
    }
}
