// src/types.rs

use std::borrow::Borrow;
use std::fmt;

/// Logical module path derived from a file's location, e.g. `src/test/foo`.
///
/// Always uses `/` as the separator, regardless of platform, and is never
/// empty. Construct one through [`crate::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(String);

impl PackageId {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        debug_assert!(!id.is_empty());
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PackageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PackageId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PackageId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// How a rendered build command is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Run through `sh -c` (or `cmd /C` on Windows).
    Shell,
    /// Split on whitespace and exec the first word directly.
    Direct,
}

impl Default for LaunchMode {
    fn default() -> Self {
        LaunchMode::Shell
    }
}

impl LaunchMode {
    pub fn from_shell_flag(shell: bool) -> Self {
        if shell {
            LaunchMode::Shell
        } else {
            LaunchMode::Direct
        }
    }
}
