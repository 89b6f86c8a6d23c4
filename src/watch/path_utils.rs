// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::{Path, PathBuf};

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    // macOS reports e.g. /private/var/... for a root given as /var/...
    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_slash(rel));
        }
    }

    None
}

/// Rebuild an absolute path under `root` from a `/`-separated relative path.
pub fn under_root(root: &Path, rel: &str) -> PathBuf {
    rel.split('/')
        .filter(|seg| !seg.is_empty())
        .fold(root.to_path_buf(), |acc, seg| acc.join(seg))
}

fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_prefix() {
        assert_eq!(
            relative_str(Path::new("/a/b"), Path::new("/a/b/c/d.go")),
            Some("c/d.go".to_string())
        );
    }

    #[test]
    fn unrelated_path() {
        assert_eq!(
            relative_str(Path::new("/definitely/not/here"), Path::new("/elsewhere/x")),
            None
        );
    }

    #[test]
    fn rebuilds_under_root() {
        assert_eq!(
            under_root(Path::new("/a/b"), "c/d.go"),
            PathBuf::from("/a/b/c/d.go")
        );
    }
}
