//! Hierarchical file catalog over a flat, path-keyed record store.
//!
//! The store only knows `(owner, path)` records and prefix queries. This
//! crate layers folder semantics on top: canonical folder paths, direct
//! child listings, and the bookkeeping that keeps records in step with an
//! external object store.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      FileCatalog                            │
//! │   list_directory │ create_folder │ delete_entry │ ingest    │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │ path (normalizer, scopes)    │ hierarchy (resolve_children) │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │                RecordStore / BackendRecordStore             │
//! │       records/{owner}\0{path}  →  JSON-encoded Record       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     StorageBackend                          │
//! │            (get, set, delete, get_range)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     MemoryBackend                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use cloudfiles_storage::{FileCatalog, MemoryRecordStore, ObjectCreated, OwnerId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = FileCatalog::new(MemoryRecordStore::default());
//!     let owner = OwnerId::new("user-1")?;
//!
//!     catalog.create_folder(&owner, "docs").await?;
//!     catalog.ingest(&[ObjectCreated::new("user-1/docs/readme.md", 120)]).await;
//!
//!     let root = catalog.list_directory(&owner, "/").await?;
//!     assert_eq!(root.len(), 1);
//!     assert!(root[0].is_folder);
//!
//!     let docs = catalog.list_directory(&owner, "docs").await?;
//!     assert_eq!(docs[0].name, "readme.md");
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`StorageResult<T>`]. Bad caller input is
//! reported as [`StorageError::Validation`] before anything is written.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with shared fixtures and assertion macros.
//!   Enable this in `[dev-dependencies]` for integration tests.

#![deny(unsafe_code)]

pub mod backend;
pub mod catalog;
pub mod error;
pub mod hierarchy;
pub mod memory;
pub mod object;
pub mod path;
pub mod records;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod types;

// Re-export primary types at crate root for convenience
pub use backend::StorageBackend;
pub use catalog::{FileCatalog, IngestReport};
pub use error::{BoxError, StorageError, StorageResult, ValidationError};
pub use hierarchy::{resolve_children, sort_for_display};
pub use memory::MemoryBackend;
pub use object::{ObjectCreated, UploadKeys, object_key_for, object_key_for_upload};
pub use path::{FolderPath, ListingScope, normalize_folder_path};
pub use records::{BackendRecordStore, MemoryRecordStore, RecordStore};
pub use types::{KeyValue, OwnerId, Record};
