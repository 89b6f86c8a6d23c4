// src/watch/hash.rs

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Compute the blake3 hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last observed content hash per watched file.
///
/// Used with `use_hash = true` to drop change events that did not change
/// any bytes (editors that touch on save, duplicate notifications).
#[derive(Debug, Default)]
pub struct ContentHashes {
    hashes: HashMap<PathBuf, String>,
}

impl ContentHashes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current content of `path` and report whether it differs
    /// from the previous observation.
    ///
    /// A file seen for the first time counts as changed, as does a file that
    /// no longer exists.
    pub fn observe(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<bool> {
        if !fs.is_file(path) {
            self.hashes.remove(path);
            return Ok(true);
        }

        let hash = compute_file_hash(fs, path)?;
        let changed = self.hashes.get(path) != Some(&hash);
        if changed {
            debug!(?path, "content hash changed");
            self.hashes.insert(path.to_path_buf(), hash);
        }
        Ok(changed)
    }

    /// Seed the cache without reporting changes (used after startup
    /// enumeration so the first real edit is compared against disk state).
    pub fn prime(&mut self, fs: &dyn FileSystem, paths: &[PathBuf]) {
        for path in paths {
            match compute_file_hash(fs, path) {
                Ok(hash) => {
                    self.hashes.insert(path.clone(), hash);
                }
                Err(err) => debug!(?path, error = %err, "could not prime content hash"),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
