//! Path utilities for slash-separated filesystem paths
//!
//! Paths are kept in normalized form: a leading slash, no trailing slash and
//! no empty segments. The root is the empty string.

/// Normalize a path: drop empty segments and the trailing slash.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        normalized.push('/');
        normalized.push_str(segment);
    }
    normalized
}

/// Whether a normalized path denotes the root.
pub fn is_root(path: &str) -> bool {
    path.is_empty()
}

/// Split a normalized path into its parent path and base name.
///
/// Returns `None` for the root, which has neither.
pub fn split_parent(path: &str) -> Option<(&str, &str)> {
    if is_root(path) {
        return None;
    }
    let idx = path.rfind('/')?;
    Some((&path[..idx], &path[idx + 1..]))
}

/// Parent of a normalized path; the root is its own parent.
pub fn parent_path(path: &str) -> &str {
    split_parent(path).map(|(parent, _)| parent).unwrap_or("")
}

/// Path of a child entry inside a normalized container path.
pub fn join_child(container_path: &str, name: &str) -> String {
    format!("{}/{}", container_path, name)
}

/// Human readable form for logs and messages.
pub fn display_path(path: &str) -> &str {
    if is_root(path) { "/" } else { path }
}
