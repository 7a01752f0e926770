//! Typed record persistence on top of a [`StorageBackend`].
//!
//! This module provides the [`RecordStore`] trait, the point-write /
//! point-delete / prefix-query contract the catalog relies on, and
//! [`BackendRecordStore`], which implements it over any ordered byte store.
//!
//! # Key Layout
//!
//! ```text
//! records/{owner}\0{path}
//! ```
//!
//! Owners never contain NUL, so every record of one owner sorts into one
//! contiguous run, and records sharing a path prefix sort into a contiguous
//! sub-run. A prefix query is therefore a single range scan from the
//! encoded prefix up to its byte successor. Values are the record's JSON
//! encoding.

use std::ops::Bound;

use async_trait::async_trait;

use crate::{
    backend::StorageBackend,
    error::{StorageError, StorageResult},
    memory::MemoryBackend,
    types::{OwnerId, Record},
};

/// Storage key prefix for records.
pub const RECORD_PREFIX: &str = "records/";

/// Persistence contract for file and folder records.
///
/// All operations are scoped to one owner. At most one record exists per
/// `(owner, path)`; writing to an occupied key replaces the old record.
///
/// # Error Handling
///
/// Operations return [`StorageResult`]. Nothing here retries; transient
/// failures are surfaced to the caller as-is.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Writes a record, replacing any record at the same `(owner, path)`.
    async fn put_record(&self, record: &Record) -> StorageResult<()>;

    /// Reads the record at `(owner, path)`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` if the record exists
    /// - `Ok(None)` if it doesn't
    /// - `Err(...)` on storage or decoding errors
    async fn get_record(&self, owner: &OwnerId, path: &str) -> StorageResult<Option<Record>>;

    /// Deletes the record at `(owner, path)`.
    ///
    /// Deleting a missing record is a no-op. Only the exact key is removed;
    /// records nested under a folder path are left untouched.
    async fn delete_record(&self, owner: &OwnerId, path: &str) -> StorageResult<()>;

    /// Returns every record of `owner` whose path starts with `prefix`.
    ///
    /// An empty prefix returns the owner's full namespace. Results are in
    /// path byte order.
    async fn query_prefix(&self, owner: &OwnerId, prefix: &str) -> StorageResult<Vec<Record>>;
}

/// [`RecordStore`] over any [`StorageBackend`].
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use cloudfiles_storage::{MemoryRecordStore, OwnerId, Record, RecordStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRecordStore::default();
///     let owner = OwnerId::new("user-1")?;
///
///     store.put_record(&Record::file(owner.clone(), "notes/todo.txt", 12, Utc::now())?).await?;
///
///     let found = store.query_prefix(&owner, "notes/").await?;
///     assert_eq!(found.len(), 1);
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct BackendRecordStore<B> {
    backend: B,
}

/// Record store backed by an in-memory [`MemoryBackend`].
pub type MemoryRecordStore = BackendRecordStore<MemoryBackend>;

impl<B: StorageBackend> BackendRecordStore<B> {
    /// Wraps a storage backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn encode_value(record: &Record) -> StorageResult<Vec<u8>> {
        serde_json::to_vec(record)
            .map_err(|e| StorageError::serialization_with_source("failed to encode record", e))
    }

    fn decode_value(bytes: &[u8]) -> StorageResult<Record> {
        serde_json::from_slice(bytes)
            .map_err(|e| StorageError::serialization_with_source("failed to decode record", e))
    }
}

/// Encodes `(owner, path)` into the ordered storage key.
#[must_use]
pub fn record_key(owner: &OwnerId, path: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(RECORD_PREFIX.len() + owner.as_str().len() + 1 + path.len());
    key.extend_from_slice(RECORD_PREFIX.as_bytes());
    key.extend_from_slice(owner.as_str().as_bytes());
    key.push(0);
    key.extend_from_slice(path.as_bytes());
    key
}

/// Smallest key greater than every key starting with `prefix`.
///
/// `None` means no such key exists (the prefix is all `0xFF`), so the scan
/// is unbounded above.
fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let last = prefix.iter().rposition(|&b| b != u8::MAX)?;
    let mut end = prefix[..=last].to_vec();
    end[last] += 1;
    Some(end)
}

#[async_trait]
impl<B: StorageBackend> RecordStore for BackendRecordStore<B> {
    #[tracing::instrument(skip(self, record), fields(owner = %record.owner, path = %record.path))]
    async fn put_record(&self, record: &Record) -> StorageResult<()> {
        let value = Self::encode_value(record)?;
        self.backend.set(record_key(&record.owner, &record.path), value).await
    }

    #[tracing::instrument(skip(self))]
    async fn get_record(&self, owner: &OwnerId, path: &str) -> StorageResult<Option<Record>> {
        match self.backend.get(&record_key(owner, path)).await? {
            Some(bytes) => Self::decode_value(&bytes).map(Some),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn delete_record(&self, owner: &OwnerId, path: &str) -> StorageResult<()> {
        self.backend.delete(&record_key(owner, path)).await
    }

    #[tracing::instrument(skip(self))]
    async fn query_prefix(&self, owner: &OwnerId, prefix: &str) -> StorageResult<Vec<Record>> {
        let start = record_key(owner, prefix);
        let end = match prefix_successor(&start) {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };

        let entries = self.backend.get_range((Bound::Included(start), end)).await?;
        tracing::debug!(count = entries.len(), "prefix query");

        entries.iter().map(|kv| Self::decode_value(&kv.value)).collect()
    }
}
