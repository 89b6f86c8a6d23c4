// src/resolve.rs

//! Mapping filesystem paths to package identifiers.
//!
//! A package identifier is the directory that contains a file, expressed
//! relative to the project root with `/` separators. Everything here is
//! pure string/path manipulation; the filesystem is never touched.

use std::path::{Component, Path, PathBuf};

use crate::errors::InvalidPathError;
use crate::types::PackageId;

/// Resolve `path` to the package directory it lives in, relative to `root`.
///
/// `/home/u/proj/src/test/foo/bar_test.go` under `/home/u/proj` resolves to
/// `src/test/foo`.
pub fn resolve(path: &Path, root: &Path) -> Result<PackageId, InvalidPathError> {
    PackageResolver::new(root).resolve(path)
}

/// Resolver bound to a project root and an optional leading subdirectory
/// that is not part of the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageResolver {
    root: PathBuf,
    strip_prefix: Option<PathBuf>,
}

impl PackageResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            strip_prefix: None,
        }
    }

    /// Also remove `prefix` (relative to the root) from every identifier.
    ///
    /// With a prefix of `src`, `<root>/src/test/foo/bar.go` resolves to
    /// `test/foo`. An empty prefix is the same as no prefix.
    pub fn with_strip_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        let prefix = prefix.into();
        self.strip_prefix = if prefix.as_os_str().is_empty() {
            None
        } else {
            Some(prefix)
        };
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn strip_prefix(&self) -> Option<&Path> {
        self.strip_prefix.as_deref()
    }

    pub fn resolve(&self, path: &Path) -> Result<PackageId, InvalidPathError> {
        let rel = path
            .strip_prefix(&self.root)
            .map_err(|_| InvalidPathError::OutsideRoot {
                path: path.to_path_buf(),
                root: self.root.clone(),
            })?;

        let rel = match &self.strip_prefix {
            Some(prefix) => rel
                .strip_prefix(prefix)
                .map_err(|_| InvalidPathError::MissingPrefix {
                    path: path.to_path_buf(),
                    prefix: prefix.clone(),
                })?,
            None => rel,
        };

        let mut segments = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(seg) => {
                    let seg = seg.to_str().ok_or_else(|| InvalidPathError::Unsupported {
                        path: path.to_path_buf(),
                    })?;
                    segments.push(seg);
                }
                _ => {
                    return Err(InvalidPathError::Unsupported {
                        path: path.to_path_buf(),
                    });
                }
            }
        }

        // Drop the file name; what remains is the package directory.
        if segments.pop().is_none() || segments.is_empty() {
            return Err(InvalidPathError::NoPackageDir {
                path: path.to_path_buf(),
            });
        }

        Ok(PackageId::new(segments.join("/")))
    }
}
