// src/engine/mod.rs

//! Orchestration engine for watch-build.
//!
//! This module ties together:
//! - path resolution for incoming change events
//! - per-package debouncing
//! - the build queue (bounded parallelism, one build per package at a time)
//! - the main runtime event loop that reacts to:
//!   - file-watch and startup triggers
//!   - build completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::path::PathBuf;

use crate::errors::WatchBuildError;
use crate::types::{LaunchMode, PackageId};

/// Outcome of one build invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    /// The command ran and exited unsuccessfully. `-1` when killed by a
    /// signal or when the exit status could not be read.
    Failed(i32),
    /// The command could not be started at all.
    SpawnFailed(String),
}

/// Why a package was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Initial build of every matching package.
    Startup,
    /// Triggered due to a filesystem event.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit once startup seeding is complete and no build is
    /// pending, debouncing or running (used for `--once`).
    pub exit_when_idle: bool,
}

/// A build handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledBuild {
    pub package: PackageId,
    /// Rendered command line.
    pub cmd: String,
    pub mode: LaunchMode,
    /// Monotonic counter for log correlation.
    pub build_id: u64,
}

/// Events flowing into the runtime from the watcher, executor, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A watched file changed; the path is absolute and under the root.
    PathChanged { path: PathBuf },
    /// Build this package (bypasses debouncing).
    PackageTriggered {
        package: PackageId,
        reason: TriggerReason,
    },
    /// All startup triggers have been sent.
    StartupComplete,
    /// A build process exited (or failed to start).
    BuildFinished {
        package: PackageId,
        build_id: u64,
        outcome: BuildOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Totals reported when the runtime stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub succeeded: usize,
    /// Failed builds in completion order.
    pub failed: Vec<(PackageId, BuildOutcome)>,
    /// Change events skipped because their path could not be resolved.
    pub skipped: usize,
}

impl BuildSummary {
    /// The first failure, as an error suitable for a non-zero exit.
    pub fn first_error(&self) -> Option<WatchBuildError> {
        self.failed.iter().find_map(|(package, outcome)| match outcome {
            BuildOutcome::Success => None,
            BuildOutcome::Failed(code) => Some(WatchBuildError::NonZeroExit {
                package: package.to_string(),
                code: *code,
            }),
            BuildOutcome::SpawnFailed(message) => Some(WatchBuildError::BuildInvocation {
                package: package.to_string(),
                message: message.clone(),
            }),
        })
    }
}

pub mod core;
pub mod debounce;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use debounce::Debouncer;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::BuildQueue;
pub use runtime::Runtime;
