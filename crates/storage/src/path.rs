//! Path normalization for the flat record namespace.
//!
//! Record paths are `/`-separated and relative to the owner's root. Folder
//! paths always carry exactly one trailing `/`; file paths never do. The
//! functions here are pure and safe to call from any thread.
//!
//! # Canonical form
//!
//! ```text
//! "  //foo//bar///  "  ──normalize──►  "foo/bar/"   (name: "bar")
//! ```
//!
//! Whitespace around each segment is trimmed, empty segments are dropped,
//! and a single trailing slash is appended. `.` and `..` segments are rejected, so
//! a canonical path can never climb out of the owner's namespace.
//!
//! Folder paths and listing requests are canonicalized; keys written as
//! given (file uploads, ingested objects) must already be canonical and are
//! rejected otherwise.

use crate::error::ValidationError;

/// Path separator used by record paths and object keys.
pub const SEPARATOR: char = '/';

/// Counts the non-empty `/`-separated segments of `path`.
///
/// ```
/// use cloudfiles_storage::path::depth;
///
/// assert_eq!(depth(""), 0);
/// assert_eq!(depth("a.txt"), 1);
/// assert_eq!(depth("a/b/"), 2);
/// assert_eq!(depth("a//b/c.txt"), 3);
/// ```
#[must_use]
pub fn depth(path: &str) -> usize {
    segments(path).count()
}

/// Returns the last non-empty segment of `path`, if any.
#[must_use]
pub fn last_segment(path: &str) -> Option<&str> {
    segments(path).next_back()
}

fn segments(path: &str) -> impl DoubleEndedIterator<Item = &str> {
    path.split(SEPARATOR).filter(|segment| !segment.is_empty())
}

/// Splits user input into trimmed, non-empty, validated segments.
fn canonical_segments(raw: &str) -> Result<Vec<&str>, ValidationError> {
    let parts: Vec<&str> =
        raw.split(SEPARATOR).map(str::trim).filter(|segment| !segment.is_empty()).collect();
    for segment in &parts {
        validate_segment(segment)?;
    }
    Ok(parts)
}

fn validate_segment(segment: &str) -> Result<(), ValidationError> {
    if segment == "." || segment == ".." {
        return Err(ValidationError::new(format!("path segment '{segment}' is not allowed")));
    }
    if segment.contains('\0') {
        return Err(ValidationError::new("path contains a NUL character"));
    }
    Ok(())
}

/// A canonical folder path together with its derived name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderPath {
    path: String,
    name: String,
}

impl FolderPath {
    /// The canonical path, always ending in exactly one `/`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// The last non-empty segment of the path.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of segments in the folder path (`a/b/` has depth 2).
    #[must_use]
    pub fn depth(&self) -> usize {
        depth(&self.path)
    }

    /// Consumes the folder path, returning `(path, name)`.
    #[must_use]
    pub fn into_parts(self) -> (String, String) {
        (self.path, self.name)
    }
}

impl std::fmt::Display for FolderPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}

/// Canonicalizes a user-supplied folder path into the store's sort-key format.
///
/// Only folder paths go through this function; file paths are never
/// normalized here.
///
/// # Errors
///
/// Returns [`ValidationError`] if no segment remains after trimming
/// whitespace and slashes, or if any segment is `.`, `..`, or contains NUL.
///
/// # Examples
///
/// ```
/// use cloudfiles_storage::path::normalize_folder_path;
///
/// let folder = normalize_folder_path("  //foo//bar///  ").unwrap();
/// assert_eq!(folder.as_str(), "foo/bar/");
/// assert_eq!(folder.name(), "bar");
///
/// assert!(normalize_folder_path("   ").is_err());
/// assert!(normalize_folder_path("a/../b").is_err());
/// ```
pub fn normalize_folder_path(raw: &str) -> Result<FolderPath, ValidationError> {
    let parts = canonical_segments(raw)?;
    let Some(name) = parts.last() else {
        return Err(ValidationError::new("folder path is empty"));
    };

    let name = (*name).to_owned();
    let mut path = parts.join("/");
    path.push(SEPARATOR);

    Ok(FolderPath { path, name })
}

/// The part of an owner's namespace a directory listing covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListingScope {
    /// The owner's root: every top-level entry.
    Root,
    /// Direct children of the folder whose canonical path is the prefix.
    Folder(String),
}

impl ListingScope {
    /// The store prefix to query: empty for the root, the folder path otherwise.
    #[must_use]
    pub fn prefix(&self) -> &str {
        match self {
            Self::Root => "",
            Self::Folder(prefix) => prefix,
        }
    }
}

/// Parses a requested listing path into a [`ListingScope`].
///
/// `""`, `"/"` and any all-slash input denote the root. Anything else is
/// reduced to its non-empty segments and given a single trailing slash, so
/// `"/docs"`, `"docs"` and `"docs/"` all list the same folder.
///
/// # Errors
///
/// Returns [`ValidationError`] for `.`/`..` segments or NUL characters.
pub fn listing_scope(requested: &str) -> Result<ListingScope, ValidationError> {
    let parts = canonical_segments(requested)?;
    if parts.is_empty() {
        return Ok(ListingScope::Root);
    }
    let mut prefix = parts.join("/");
    prefix.push(SEPARATOR);
    Ok(ListingScope::Folder(prefix))
}

/// Validates a record key relative to the owner's root.
///
/// The key is used as-is as a record path, so it must already be in
/// canonical form: non-empty segments without surrounding whitespace,
/// optionally followed by one trailing `/` for a folder. Listings trim
/// requested segments, so a key outside this form could never be listed.
///
/// # Errors
///
/// Returns [`ValidationError`] if the key is blank, has an empty or
/// whitespace-edged segment, has a `.`/`..` segment, or contains NUL.
pub fn validate_relative_key(key: &str) -> Result<&str, ValidationError> {
    if key.trim().is_empty() {
        return Err(ValidationError::new("file key is empty"));
    }
    let body = key.strip_suffix(SEPARATOR).unwrap_or(key);
    for segment in body.split(SEPARATOR) {
        if segment.is_empty() {
            return Err(ValidationError::new(format!("key '{key}' has an empty path segment")));
        }
        if segment.trim() != segment {
            return Err(ValidationError::new(format!(
                "path segment '{segment}' has surrounding whitespace"
            )));
        }
        validate_segment(segment)?;
    }
    Ok(key)
}

/// Validates the path of a file record.
///
/// Same rules as [`validate_relative_key`], and the path must not end in
/// `/`, which is reserved for folders.
///
/// # Errors
///
/// Returns [`ValidationError`] if the path is not a valid relative key or
/// ends in `/`.
pub fn validate_file_path(path: &str) -> Result<&str, ValidationError> {
    let path = validate_relative_key(path)?;
    if path.ends_with(SEPARATOR) {
        return Err(ValidationError::new(format!("file path '{path}' ends in '/'")));
    }
    Ok(path)
}

/// Returns the canonical path of the folder containing `path`.
///
/// Top-level entries live in the root, which is represented as `"/"`.
///
/// ```
/// use cloudfiles_storage::path::parent_path;
///
/// assert_eq!(parent_path("a/b/c.txt"), "a/b/");
/// assert_eq!(parent_path("a/b/"), "a/");
/// assert_eq!(parent_path("a.txt"), "/");
/// ```
#[must_use]
pub fn parent_path(path: &str) -> String {
    let parts: Vec<&str> = segments(path).collect();
    match parts.split_last() {
        Some((_, parent)) if !parent.is_empty() => {
            let mut joined = parent.join("/");
            joined.push(SEPARATOR);
            joined
        },
        _ => SEPARATOR.to_string(),
    }
}
