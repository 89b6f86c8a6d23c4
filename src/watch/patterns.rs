// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::model::WatchSection;
use crate::fs::FileSystem;

/// Compiled watch/exclude glob patterns.
///
/// The patterns are relative to the package root. Callers pass relative
/// paths with forward slashes (e.g. `"src/test/foo/bar_test.go"`) into
/// [`WatchPatterns::matches`].
#[derive(Clone)]
pub struct WatchPatterns {
    include: Vec<String>,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for WatchPatterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchPatterns")
            .field("include", &self.include)
            .finish_non_exhaustive()
    }
}

impl WatchPatterns {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let watch_set = build_globset(include).context("building watch globset")?;

        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building exclude globset")?)
        };

        Ok(Self {
            include: include.to_vec(),
            watch_set,
            exclude_set,
        })
    }

    pub fn from_config(watch: &WatchSection) -> Result<Self> {
        Self::new(&watch.patterns, &watch.exclude)
    }

    /// Returns true if the given path (relative to the root) is watched.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Collect all files under `root` that match `patterns`, sorted by path.
///
/// Sorting makes the startup build order independent of directory
/// iteration order.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    patterns: &WatchPatterns,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if patterns.matches(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn patterns(include: &[&str], exclude: &[&str]) -> WatchPatterns {
        let inc: Vec<String> = include.iter().map(|s| s.to_string()).collect();
        let exc: Vec<String> = exclude.iter().map(|s| s.to_string()).collect();
        WatchPatterns::new(&inc, &exc).unwrap()
    }

    #[test]
    fn include_and_exclude() {
        let p = patterns(&["src/**/*.go"], &["src/**/*_gen.go"]);
        assert!(p.matches("src/test/foo/bar_test.go"));
        assert!(!p.matches("src/test/foo/types_gen.go"));
        assert!(!p.matches("docs/readme.md"));
    }

    #[test]
    fn collects_sorted_matches_only() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/src/b/two.go", b"b");
        fs.add_file("/proj/src/a/one.go", b"a");
        fs.add_file("/proj/src/a/notes.txt", b"n");
        fs.add_file("/proj/vendor/x/x.go", b"x");

        let files =
            collect_matching_files(&fs, Path::new("/proj"), &patterns(&["src/**/*.go"], &[]))
                .unwrap();

        assert_eq!(
            files,
            vec![
                PathBuf::from("/proj/src/a/one.go"),
                PathBuf::from("/proj/src/b/two.go"),
            ]
        );
    }
}
