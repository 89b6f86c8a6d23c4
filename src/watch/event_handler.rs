// src/watch/event_handler.rs

//! Event processing logic for file system changes.

use std::path::Path;
use std::sync::{Arc, Mutex};

use notify::EventKind;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::fs::FileSystem;
use crate::watch::hash::ContentHashes;
use crate::watch::path_utils::{relative_str, under_root};
use crate::watch::patterns::WatchPatterns;

/// Only events that can change what a build sees are forwarded.
pub fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    )
}

/// Process a single changed path and forward it to the runtime.
///
/// This function:
/// 1. Relativizes the path against the root
/// 2. Drops directories and paths not matching the watch patterns
/// 3. Applies the content-hash filter if enabled
/// 4. Sends `PathChanged` to the runtime
///
/// Returns `false` once the runtime channel is closed.
pub async fn process_file_change(
    fs: Arc<dyn FileSystem>,
    root: &Path,
    path: &Path,
    patterns: &WatchPatterns,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    hashes: Option<Arc<Mutex<ContentHashes>>>,
) -> bool {
    let rel_str = match relative_str(root, path) {
        Some(s) if !s.is_empty() => s,
        Some(_) => return true,
        None => {
            warn!(
                "could not relativize path {:?} against root {:?}",
                path, root
            );
            return true;
        }
    };

    // Rebuilt from the canonical root so resolution and the hash cache see
    // one spelling even when notify reports another.
    let abs = under_root(root, &rel_str);

    if fs.is_dir(&abs) || !patterns.matches(&rel_str) {
        return true;
    }

    debug!(?path, rel = %rel_str, "normalized event path");

    if let Some(hashes) = hashes {
        if !content_changed(fs, &abs, &rel_str, hashes).await {
            return true;
        }
    }

    let event = RuntimeEvent::PathChanged { path: abs };

    if let Err(err) = runtime_tx.send(event).await {
        warn!("failed to send RuntimeEvent::PathChanged: {err}");
        return false;
    }
    true
}

/// Check whether the file's content differs from the last observation.
async fn content_changed(
    fs: Arc<dyn FileSystem>,
    path: &Path,
    rel_path: &str,
    hashes: Arc<Mutex<ContentHashes>>,
) -> bool {
    let path = path.to_path_buf();
    let rel_path = rel_path.to_string();

    tokio::task::spawn_blocking(move || {
        let mut hashes = match hashes.lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("content hash mutex poisoned; forwarding change anyway");
                return true;
            }
        };

        match hashes.observe(fs.as_ref(), &path) {
            Ok(true) => true,
            Ok(false) => {
                info!(path = %rel_path, "content unchanged; ignoring event");
                false
            }
            Err(err) => {
                warn!(
                    path = %rel_path,
                    error = %err,
                    "failed to hash changed file; forwarding change anyway"
                );
                true
            }
        }
    })
    .await
    .unwrap_or(true) // If the blocking task panics, default to forwarding.
}
