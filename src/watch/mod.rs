// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling the `watch` / `exclude` glob patterns.
//! - Enumerating matching files for the startup build.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - (Optionally) content hashing to drop events that changed no bytes.
//!
//! It does **not** know about packages or builds; it only turns filesystem
//! changes into `RuntimeEvent::PathChanged`.

pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use hash::{compute_file_hash, ContentHashes};
pub use patterns::{collect_matching_files, WatchPatterns};
pub use watcher::{spawn_watcher, WatchContext, WatcherHandle};
