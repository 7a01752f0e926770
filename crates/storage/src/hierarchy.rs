//! Directory-listing semantics over a flat record set.
//!
//! The record store has no notion of directories: it only knows
//! `(owner, path)` keys and can return every record whose path starts with
//! a given string. This module turns such a flat candidate set into the
//! "direct children" view a directory listing needs.
//!
//! ```text
//! requested "a/b"       prefix "a/b/" (depth 2)
//!
//!   a/b/            folder itself     ✗ excluded
//!   a/b/c.txt       depth 3           ✓
//!   a/b/d/          depth 3           ✓
//!   a/b/d/e.txt     depth 4           ✗ grandchild
//!   a/bc.txt        no prefix match   ✗
//! ```
//!
//! The resolver is pure and imposes no ordering; callers that present a
//! listing use [`sort_for_display`].

use crate::{path, types::Record};

/// Filters `records` down to the direct children of `requested_path`.
///
/// Two regimes, selected by whether `requested_path` denotes the root:
///
/// - **Root** (`""` or `"/"`): keeps every record of depth 1.
/// - **Scoped**: with `prefix` being `requested_path` plus one trailing `/`
///   if absent, keeps records whose path starts with `prefix` and whose
///   depth is exactly `depth(prefix) + 1`. The folder record at `prefix`
///   itself is never returned.
///
/// `requested_path` must already be canonical: free of traversal segments
/// and of empty segments, so `"//"` is not another spelling of the root.
/// Canonicalize raw input with [`listing_scope`](crate::path::listing_scope)
/// first; debug builds assert this. An empty candidate set yields an empty
/// result.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use cloudfiles_storage::{hierarchy::resolve_children, OwnerId, Record};
///
/// let owner = OwnerId::new("u1").unwrap();
/// let now = Utc::now();
/// let records = vec![
///     Record::file(owner.clone(), "a/b/c.txt", 3, now).unwrap(),
///     Record::file(owner.clone(), "a/b/d/e.txt", 4, now).unwrap(),
///     Record::file(owner, "top.txt", 1, now).unwrap(),
/// ];
///
/// let children = resolve_children(records.clone(), "a/b");
/// assert_eq!(children.len(), 1);
/// assert_eq!(children[0].name, "c.txt");
///
/// let root = resolve_children(records, "/");
/// assert_eq!(root.len(), 1);
/// assert_eq!(root[0].path, "top.txt");
/// ```
#[must_use]
pub fn resolve_children<I>(records: I, requested_path: &str) -> Vec<Record>
where
    I: IntoIterator<Item = Record>,
{
    debug_assert!(
        !requested_path.contains("//"),
        "resolve_children expects a canonical path, got {requested_path:?}"
    );
    if requested_path.is_empty() || requested_path == "/" {
        return records.into_iter().filter(|record| record.depth() == 1).collect();
    }

    let prefix = if requested_path.ends_with(path::SEPARATOR) {
        requested_path.to_owned()
    } else {
        format!("{requested_path}/")
    };
    let child_depth = path::depth(&prefix) + 1;

    records
        .into_iter()
        .filter(|record| record.path.starts_with(&prefix))
        .filter(|record| !(record.is_folder && record.path == prefix))
        .filter(|record| record.depth() == child_depth)
        .collect()
}

/// Orders a listing for presentation: folders first, then by name.
///
/// Names compare case-insensitively, with the exact name as a tie-break so
/// the order is total and stable across calls.
pub fn sort_for_display(records: &mut [Record]) {
    records.sort_by_cached_key(|record| (!record.is_folder, record.name.to_lowercase(), record.name.clone()));
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{path::normalize_folder_path, types::OwnerId};

    fn owner() -> OwnerId {
        OwnerId::new("user-1").unwrap()
    }

    fn file(path: &str) -> Record {
        Record::file(owner(), path, 10, Utc::now()).unwrap()
    }

    fn folder(path: &str) -> Record {
        Record::folder(owner(), normalize_folder_path(path).unwrap(), Utc::now())
    }

    fn paths(records: &[Record]) -> Vec<&str> {
        let mut paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        paths.sort_unstable();
        paths
    }

    #[test]
    fn test_root_keeps_top_level_only() {
        let records = vec![file("a.txt"), folder("docs"), file("docs/b.txt"), folder("docs/old")];

        let children = resolve_children(records.clone(), "/");
        assert_eq!(paths(&children), vec!["a.txt", "docs/"]);

        let children = resolve_children(records, "");
        assert_eq!(paths(&children), vec!["a.txt", "docs/"]);
    }

    #[test]
    fn test_scoped_listing_excludes_self_and_grandchildren() {
        let records = vec![
            folder("a/b"),
            file("a/b/c.txt"),
            folder("a/b/d"),
            file("a/b/d/e.txt"),
            file("a/bc.txt"),
        ];

        let children = resolve_children(records, "a/b");
        assert_eq!(paths(&children), vec!["a/b/c.txt", "a/b/d/"]);
    }

    #[test]
    fn test_trailing_slash_is_equivalent() {
        let records = vec![folder("a"), file("a/x.txt")];
        assert_eq!(resolve_children(records.clone(), "a"), resolve_children(records, "a/"));
    }

    #[test]
    fn test_empty_candidates_yield_empty_result() {
        assert!(resolve_children(Vec::new(), "/").is_empty());
        assert!(resolve_children(Vec::new(), "nothing/here").is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "canonical path")]
    fn test_uncanonical_root_is_rejected_in_debug() {
        let _ = resolve_children(vec![file("a.txt")], "//");
    }

    #[test]
    fn test_sort_for_display_puts_folders_first() {
        let mut records = vec![file("b.txt"), folder("zeta"), file("A.txt"), folder("alpha")];
        sort_for_display(&mut records);

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta", "A.txt", "b.txt"]);
    }
}
