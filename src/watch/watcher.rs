// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::errors::{Result, WatchBuildError};
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::event_handler::{is_relevant, process_file_change};
use crate::watch::hash::ContentHashes;
use crate::watch::patterns::WatchPatterns;

/// Everything the watcher needs to turn raw notify events into
/// `RuntimeEvent::PathChanged`.
#[derive(Debug)]
pub struct WatchContext {
    /// Canonical project root; watched recursively.
    pub root: PathBuf,
    pub patterns: WatchPatterns,
    /// Content hashes for `use_hash = true`; `None` disables the filter.
    pub hashes: Option<ContentHashes>,
}

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching; [`WatcherHandle::stop`] also ends the forwarding
/// task.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    root: PathBuf,
    forward_task: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl WatcherHandle {
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Release the subscription and stop forwarding events.
    pub fn stop(self) {
        self.forward_task.abort();
        info!("file watcher stopped on {:?}", self.root);
    }
}

/// Spawn a filesystem watcher that observes `ctx.root` recursively and
/// sends `RuntimeEvent::PathChanged` for every changed file matching the
/// watch patterns.
///
/// Fails with [`WatchBuildError::WatchSubscription`] if the subscription
/// cannot be established.
pub fn spawn_watcher(
    ctx: WatchContext,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let WatchContext {
        root,
        patterns,
        hashes,
    } = ctx;

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event_tx.send(event).is_err() {
                    debug!("watcher forward channel closed; dropping notify event");
                }
            }
            Err(err) => {
                warn!(error = %err, "file watch error");
            }
        },
        Config::default(),
    )
    .map_err(|e| WatchBuildError::WatchSubscription(e.to_string()))?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| WatchBuildError::WatchSubscription(format!("{}: {e}", root.display())))?;

    info!("file watcher started on {:?}", root);

    let async_root = root.clone();
    let patterns = Arc::new(patterns);
    let hashes = hashes.map(|h| Arc::new(Mutex::new(h)));
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let forward_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");

            if !is_relevant(&event.kind) {
                continue;
            }

            for path in event.paths {
                let delivered = process_file_change(
                    fs.clone(),
                    &async_root,
                    &path,
                    &patterns,
                    &runtime_tx,
                    hashes.clone(),
                )
                .await;

                if !delivered {
                    debug!("runtime channel closed; stopping watcher event loop");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        root,
        forward_task,
    })
}
