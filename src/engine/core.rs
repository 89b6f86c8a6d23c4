// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sleeping until debounce deadlines and the shutdown grace period
//! - sending `ScheduledBuild`s to the executor
//!
//! Time is an explicit argument so the core can be unit tested without
//! Tokio, channels, filesystem, or processes.

use std::time::{Duration, Instant};

use crate::config::model::ConfigFile;
use crate::engine::debounce::Debouncer;
use crate::engine::event_handlers::CoreStep;
use crate::engine::queue::BuildQueue;
use crate::engine::{BuildSummary, RuntimeEvent, RuntimeOptions};
use crate::exec::template::BuildCommand;
use crate::resolve::PackageResolver;
use crate::types::LaunchMode;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    pub(crate) resolver: PackageResolver,
    pub(crate) command: BuildCommand,
    pub(crate) queue: BuildQueue,
    pub(crate) debouncer: Debouncer,
    pub(crate) options: RuntimeOptions,
    pub(crate) shutting_down: bool,
    pub(crate) startup_complete: bool,
    pub(crate) next_build_id: u64,
    pub(crate) summary: BuildSummary,
}

impl CoreRuntime {
    pub fn new(
        resolver: PackageResolver,
        command: BuildCommand,
        max_concurrent: usize,
        debounce: Duration,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            resolver,
            command,
            queue: BuildQueue::new(max_concurrent),
            debouncer: Debouncer::new(debounce),
            options,
            shutting_down: false,
            startup_complete: false,
            next_build_id: 1,
            summary: BuildSummary::default(),
        }
    }

    /// Build a core from validated config. `resolver` carries the
    /// canonicalized root.
    pub fn from_config(
        cfg: &ConfigFile,
        resolver: PackageResolver,
        options: RuntimeOptions,
    ) -> Self {
        let command = BuildCommand::new(
            cfg.build.cmd.clone(),
            LaunchMode::from_shell_flag(cfg.build.shell),
        );
        Self::new(
            resolver,
            command,
            cfg.config.max_concurrent,
            cfg.config.debounce(),
            options,
        )
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent, now: Instant) -> CoreStep {
        match event {
            RuntimeEvent::PathChanged { path } => self.handle_path_changed(path, now),
            RuntimeEvent::PackageTriggered { package, reason } => {
                self.handle_package_triggered(package, reason)
            }
            RuntimeEvent::StartupComplete => self.handle_startup_complete(),
            RuntimeEvent::BuildFinished {
                package,
                build_id,
                outcome,
            } => self.handle_build_finished(package, build_id, outcome),
            RuntimeEvent::ShutdownRequested => self.handle_shutdown(),
        }
    }

    /// Release every debounced package whose window has elapsed.
    pub fn poll_timers(&mut self, now: Instant) -> CoreStep {
        self.handle_debounce_elapsed(now)
    }

    /// Earliest debounce deadline, if any package is waiting.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.next_deadline()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// No build pending, debouncing or running.
    pub fn is_idle(&self) -> bool {
        self.queue.is_idle() && self.debouncer.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.queue.in_flight_len()
    }

    pub fn summary(&self) -> &BuildSummary {
        &self.summary
    }

    pub fn into_summary(self) -> BuildSummary {
        self.summary
    }
}
