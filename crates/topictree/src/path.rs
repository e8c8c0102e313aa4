//! Topic path helpers.
//!
//! Paths are `/`-separated with no leading or trailing separator. The empty
//! path is the namespace root and is an ancestor of every other path.

/// Path segment separator.
pub const SEPARATOR: char = '/';

/// Normalize a user-supplied path by trimming surrounding separators.
pub fn normalize(path: &str) -> String {
    path.trim_matches(SEPARATOR).to_string()
}

/// Truncate a path at its last separator.
///
/// Returns `None` for a single-segment path; the namespace root is not
/// reported as a parent.
pub fn parent(path: &str) -> Option<&str> {
    path.rsplit_once(SEPARATOR).map(|(head, _)| head)
}

/// Number of segments in a path. The root has depth 0.
pub fn depth(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.split(SEPARATOR).count()
    }
}

/// Check whether `path` lies strictly below `ancestor`.
pub fn is_descendant_of(path: &str, ancestor: &str) -> bool {
    if ancestor.is_empty() {
        return !path.is_empty();
    }
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path[ancestor.len()..].starts_with(SEPARATOR)
}

/// Iterate over the proper ancestors of a path, nearest first.
///
/// The root is not included.
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(parent(path), |p| parent(p))
}
