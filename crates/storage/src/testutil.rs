//! Shared test utilities for catalog and record store testing.
//!
//! This module provides record fixtures, pre-populated stores, and
//! assertion macros for [`StorageResult`] values. It is feature-gated behind
//! `testutil` to prevent leaking into production builds.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! cloudfiles-storage = { path = "../storage", features = ["testutil"] }
//! ```
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use cloudfiles_storage::testutil::{owner, populated_store};
//! ```

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    error::{StorageError, StorageResult},
    path::normalize_folder_path,
    records::{MemoryRecordStore, RecordStore},
    types::{OwnerId, Record},
};

/// Fixed timestamp used by fixtures so records compare equal across runs.
#[must_use]
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().unwrap_or_default()
}

/// Builds an [`OwnerId`], panicking on invalid input.
///
/// # Panics
///
/// Panics if `id` is not a valid owner identity.
#[must_use]
pub fn owner(id: &str) -> OwnerId {
    OwnerId::new(id).expect("invalid test owner")
}

/// Builds a record for `path`: a folder if it ends in `/`, a file otherwise.
///
/// Files get a size equal to the path length so sizes differ per fixture.
///
/// # Panics
///
/// Panics if a folder path fails normalization or a file path is not
/// canonical.
#[must_use]
pub fn record(owner: &OwnerId, path: &str) -> Record {
    if path.ends_with('/') {
        let folder = normalize_folder_path(path).expect("invalid test folder path");
        Record::folder(owner.clone(), folder, fixed_time())
    } else {
        Record::file(owner.clone(), path, path.len() as u64, fixed_time())
            .expect("invalid test file path")
    }
}

/// Creates a [`MemoryRecordStore`] holding one record per path for `owner`.
///
/// # Panics
///
/// Panics if any write fails (should not happen with the in-memory backend).
pub async fn populated_store(owner: &OwnerId, paths: &[&str]) -> MemoryRecordStore {
    let store = MemoryRecordStore::default();
    for path in paths {
        store.put_record(&record(owner, path)).await.expect("populate put failed");
    }
    store
}

/// Sorted paths of `records`, for order-insensitive comparisons.
#[must_use]
pub fn sorted_paths(records: &[Record]) -> Vec<String> {
    let mut paths: Vec<String> = records.iter().map(|r| r.path.clone()).collect();
    paths.sort_unstable();
    paths
}

/// Assert that a [`StorageResult`] is a [`StorageError::Validation`].
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use cloudfiles_storage::assert_validation_error;
/// use cloudfiles_storage::error::{StorageError, StorageResult};
///
/// let result: StorageResult<()> = Err(StorageError::validation("folder path is empty"));
/// assert_validation_error!(result);
/// ```
#[macro_export]
macro_rules! assert_validation_error {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::Validation(_))),
            "expected StorageError::Validation, got: {:?}",
            $result,
        );
    };
    ($result:expr, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::Validation(_))),
            "{}: expected StorageError::Validation, got: {:?}",
            $msg,
            $result,
        );
    };
}

/// Assert that a [`StorageResult`] is `Ok`.
///
/// Returns the inner value on success, panics with a descriptive message
/// on failure.
#[macro_export]
macro_rules! assert_storage_ok {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("expected Ok, got StorageError: {e:?}"),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("{}: expected Ok, got StorageError: {e:?}", $msg),
        }
    };
}

/// Helper to verify that a result is a `Validation` error.
pub fn is_validation_error<T>(result: &StorageResult<T>) -> bool {
    matches!(result, Err(StorageError::Validation(_)))
}
