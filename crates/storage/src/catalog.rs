//! File catalog: folder/file operations over a [`RecordStore`].
//!
//! [`FileCatalog`] composes the path normalizer, the hierarchy resolver and
//! a record store into the operations a file-browsing API needs. Every
//! operation takes an already-authenticated [`OwnerId`]; input validation
//! always happens before the store is touched, so a rejected request never
//! writes anything.

use chrono::Utc;

use crate::{
    error::StorageResult,
    hierarchy,
    object::{self, ObjectCreated},
    path::{self, ListingScope},
    records::RecordStore,
    types::{OwnerId, Record},
};

/// Outcome of ingesting a batch of upload notifications.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// File records written.
    pub written: usize,
    /// Folder placeholder objects that were ignored.
    pub skipped: usize,
    /// Malformed events and events whose record write failed.
    pub failed: usize,
}

/// Folder and file operations for one record store.
///
/// # Examples
///
/// ```
/// use cloudfiles_storage::{FileCatalog, MemoryRecordStore, OwnerId};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let catalog = FileCatalog::new(MemoryRecordStore::default());
///     let owner = OwnerId::new("user-1")?;
///
///     catalog.create_folder(&owner, " /photos/2024/ ").await?;
///
///     let top = catalog.list_directory(&owner, "photos").await?;
///     assert_eq!(top.len(), 1);
///     assert_eq!(top[0].path, "photos/2024/");
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct FileCatalog<S> {
    store: S,
}

impl<S: RecordStore> FileCatalog<S> {
    /// Creates a catalog over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying record store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Lists the direct children of `requested_path`.
    ///
    /// `""` and `"/"` list the owner's root. Result order is unspecified;
    /// use [`sort_for_display`](crate::hierarchy::sort_for_display) for
    /// presentation.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Validation`](crate::StorageError::Validation)
    /// for traversal segments, or the store's error if the query fails.
    #[tracing::instrument(skip(self))]
    pub async fn list_directory(
        &self,
        owner: &OwnerId,
        requested_path: &str,
    ) -> StorageResult<Vec<Record>> {
        let scope = path::listing_scope(requested_path)?;
        let candidates = self.store.query_prefix(owner, scope.prefix()).await?;

        let requested = match &scope {
            ListingScope::Root => "/",
            ListingScope::Folder(prefix) => prefix.as_str(),
        };
        let children = hierarchy::resolve_children(candidates, requested);
        tracing::debug!(count = children.len(), "listed directory");
        Ok(children)
    }

    /// Creates (or overwrites) the folder record at the normalized `raw_path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Validation`](crate::StorageError::Validation)
    /// if the path normalizes to nothing or traverses; nothing is written
    /// in that case.
    #[tracing::instrument(skip(self))]
    pub async fn create_folder(&self, owner: &OwnerId, raw_path: &str) -> StorageResult<Record> {
        let folder = path::normalize_folder_path(raw_path)?;
        let record = Record::folder(owner.clone(), folder, Utc::now());

        self.store.put_record(&record).await?;
        tracing::info!(path = %record.path, "created folder");
        Ok(record)
    }

    /// Deletes the record at `file_key`.
    ///
    /// Only the exact record is removed. Deleting a folder record leaves
    /// any records beneath it in place.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Validation`](crate::StorageError::Validation)
    /// if the key is blank, traverses, or is not canonical.
    #[tracing::instrument(skip(self))]
    pub async fn delete_entry(&self, owner: &OwnerId, file_key: &str) -> StorageResult<()> {
        let key = path::validate_relative_key(file_key)?;
        self.store.delete_record(owner, key).await
    }

    /// Records file metadata for a batch of upload notifications.
    ///
    /// Each event is handled independently: folder placeholders (zero-size
    /// keys ending in `/`) are skipped, and malformed keys or failed writes
    /// are logged and counted without aborting the rest of the batch. A
    /// non-empty object whose key ends in `/` is malformed: its path belongs
    /// to a folder record, which is left untouched.
    #[tracing::instrument(skip(self, events), fields(count = events.len()))]
    pub async fn ingest(&self, events: &[ObjectCreated]) -> IngestReport {
        let mut report = IngestReport::default();

        for event in events {
            let key = match object::decode_object_key(&event.key) {
                Ok(key) => key,
                Err(e) => {
                    tracing::warn!(key = %event.key, error = %e, "skipping undecodable object key");
                    report.failed += 1;
                    continue;
                },
            };

            if event.size == 0 && key.ends_with(path::SEPARATOR) {
                tracing::debug!(%key, "skipping folder placeholder object");
                report.skipped += 1;
                continue;
            }

            let created_at = event.event_time.unwrap_or_else(Utc::now);
            let record = match object::split_object_key(&key).and_then(|(owner, file_path)| {
                Record::file(owner, file_path, event.size, created_at)
            }) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(%key, error = %e, "skipping malformed object key");
                    report.failed += 1;
                    continue;
                },
            };

            match self.store.put_record(&record).await {
                Ok(()) => report.written += 1,
                Err(e) => {
                    tracing::warn!(%key, error = %e, "failed to record object metadata");
                    report.failed += 1;
                },
            }
        }

        report
    }
}
