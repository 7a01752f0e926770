//! Object-store key derivation and upload notifications.
//!
//! File contents live in an external object store under
//! `{owner}/{relative_key}`, where `relative_key` is also the record path.
//! The helpers here derive those keys for uploads and downloads and parse
//! the key carried by an "object created" notification back into an owner
//! and a record path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::ValidationError,
    path::{self, SEPARATOR},
    types::OwnerId,
};

/// Object-store keys for a pending upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadKeys {
    /// Key relative to the owner's root; becomes the record path.
    pub relative_key: String,
    /// Full object-store key, `{owner}/{relative_key}`.
    pub object_key: String,
}

/// Derives the keys for uploading `filename` into the folder `path_prefix`.
///
/// Leading and trailing slashes are stripped from `path_prefix`; an empty
/// prefix places the file at the owner's root.
///
/// # Errors
///
/// Returns [`ValidationError`] if `filename` is blank, contains `/`, or if
/// the resulting key has a traversal segment.
///
/// # Examples
///
/// ```
/// use cloudfiles_storage::{object::object_key_for_upload, OwnerId};
///
/// let owner = OwnerId::new("u1").unwrap();
/// let keys = object_key_for_upload(&owner, "/photos/2024/", "beach.jpg").unwrap();
/// assert_eq!(keys.relative_key, "photos/2024/beach.jpg");
/// assert_eq!(keys.object_key, "u1/photos/2024/beach.jpg");
///
/// let keys = object_key_for_upload(&owner, "", "notes.txt").unwrap();
/// assert_eq!(keys.object_key, "u1/notes.txt");
/// ```
pub fn object_key_for_upload(
    owner: &OwnerId,
    path_prefix: &str,
    filename: &str,
) -> Result<UploadKeys, ValidationError> {
    if filename.trim().is_empty() {
        return Err(ValidationError::new("filename is empty"));
    }
    if filename.contains(SEPARATOR) {
        return Err(ValidationError::new("filename must not contain '/'"));
    }

    let prefix = path_prefix.trim_matches(SEPARATOR);
    let relative_key =
        if prefix.is_empty() { filename.to_owned() } else { format!("{prefix}/{filename}") };
    path::validate_relative_key(&relative_key)?;

    let object_key = format!("{owner}/{relative_key}");
    Ok(UploadKeys { relative_key, object_key })
}

/// Returns the object-store key for an existing file of `owner`.
///
/// # Errors
///
/// Returns [`ValidationError`] if `relative_key` is blank or contains a
/// traversal segment.
pub fn object_key_for(owner: &OwnerId, relative_key: &str) -> Result<String, ValidationError> {
    let relative_key = path::validate_relative_key(relative_key)?;
    Ok(format!("{owner}/{relative_key}"))
}

/// File name offered to the client when downloading `relative_key`.
#[must_use]
pub fn download_filename(relative_key: &str) -> &str {
    path::last_segment(relative_key).unwrap_or(relative_key)
}

/// Notification that an object was written to the object store.
///
/// `key` is in the store's notification encoding: percent-encoded, with
/// spaces sent as `+`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCreated {
    /// Encoded object key, `{owner}/{path}`.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// When the object was written; ingestion falls back to "now" if absent.
    #[serde(default)]
    pub event_time: Option<DateTime<Utc>>,
}

impl ObjectCreated {
    /// Creates an event for `key`.
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self { key: key.into(), size, event_time: None }
    }

    /// Sets the event time.
    #[must_use]
    pub fn at(mut self, event_time: DateTime<Utc>) -> Self {
        self.event_time = Some(event_time);
        self
    }
}

/// Decodes a notification object key (`+` is a space, then percent-decoding).
///
/// # Errors
///
/// Returns [`ValidationError`] if the percent-decoded bytes are not UTF-8.
pub fn decode_object_key(encoded: &str) -> Result<String, ValidationError> {
    let spaced = encoded.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| ValidationError::new(format!("object key is not valid UTF-8: {e}")))
}

/// Splits a decoded object key into its owner and record path.
///
/// # Errors
///
/// Returns [`ValidationError`] if the key has no `/`, the owner is invalid,
/// or the path is not a canonical file path (see
/// [`validate_file_path`](path::validate_file_path)).
pub fn split_object_key(key: &str) -> Result<(OwnerId, String), ValidationError> {
    let Some((owner, path)) = key.split_once(SEPARATOR) else {
        return Err(ValidationError::new(format!("object key '{key}' has no owner segment")));
    };
    let owner = OwnerId::new(owner)?;
    let path = path::validate_file_path(path)?;
    Ok((owner, path.to_owned()))
}
