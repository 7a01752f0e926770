//! Storage error types and result alias.
//!
//! This module defines the error types that can occur during record store
//! operations and path validation. Every storage backend maps its internal
//! errors to [`StorageError`].
//!
//! # Error Types
//!
//! - [`StorageError::Serialization`] - Record encoding/decoding failures
//! - [`StorageError::Validation`] - Caller input rejected before touching the store
//!
//! # Example
//!
//! ```
//! use cloudfiles_storage::{StorageError, StorageResult};
//!
//! fn create(path: &str) -> StorageResult<()> {
//!     Err(StorageError::validation(format!("folder path '{path}' is empty")))
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Caller input that failed shape validation.
///
/// Produced by the path normalizer and object-key helpers. A validation
/// failure always happens before any store access, so nothing is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation error: {message}")]
pub struct ValidationError {
    /// Human-readable description of what was wrong with the input.
    pub message: String,
}

impl ValidationError {
    /// Creates a new validation error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Errors that can occur during storage operations.
///
/// Errors preserve their source chain via the `#[source]` attribute, enabling
/// debugging tools to display the full error context.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`; downstream match expressions
/// must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// A record could not be encoded for storage or decoded when read back.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
        /// The underlying error that caused serialization to fail.
        #[source]
        source: Option<BoxError>,
    },

    /// Caller input was rejected before any store access.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl StorageError {
    /// Creates a new `Serialization` error with a message and source error.
    #[must_use]
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Validation` error with the given message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(message))
    }
}
