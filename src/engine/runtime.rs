// src/engine/runtime.rs

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::engine::ScheduledBuild;
use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{BuildSummary, CoreCommand, RuntimeEvent};

/// Drives the core in response to `RuntimeEvent`s and timers, and delegates
/// actual command execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    grace_period: Duration,
    shutdown_deadline: Option<Instant>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("grace_period", &self.grace_period)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        grace_period: Duration,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            grace_period,
            shutdown_deadline: None,
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Wakes up at the next debounce deadline.
    /// - After shutdown is requested, waits at most `grace_period` for
    ///   in-flight builds before aborting them.
    pub async fn run(mut self) -> Result<BuildSummary> {
        info!("watch-build runtime started");

        // The core is fed Tokio's clock so a paused test clock also drives
        // debounce deadlines.
        loop {
            let debounce_at = self.core.next_deadline().map(Instant::from_std);
            let shutdown_at = self.shutdown_deadline;

            let step = tokio::select! {
                maybe_event = self.event_rx.recv() => match maybe_event {
                    Some(event) => {
                        debug!(?event, "runtime received event");
                        self.core.step(event, Instant::now().into_std())
                    }
                    None => {
                        info!("runtime event channel closed; exiting");
                        break;
                    }
                },
                _ = sleep_until_opt(debounce_at) => {
                    self.core.poll_timers(Instant::now().into_std())
                }
                _ = sleep_until_opt(shutdown_at) => {
                    warn!(
                        in_flight = self.core.in_flight(),
                        grace_ms = self.grace_period.as_millis() as u64,
                        "grace period elapsed; killing in-flight builds"
                    );
                    self.executor.abort_all().await?;
                    break;
                }
            };

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if self.core.is_shutting_down() && self.shutdown_deadline.is_none() {
                self.shutdown_deadline = Some(Instant::now() + self.grace_period);
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(self.core.into_summary())
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::StartBuilds(builds) => {
                self.start_builds(builds).await?;
            }
            CoreCommand::RequestExit => {
                // keep_running=false already ends the loop.
                debug!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn start_builds(&mut self, builds: Vec<ScheduledBuild>) -> Result<()> {
        if builds.is_empty() {
            return Ok(());
        }

        let packages: Vec<_> = builds.iter().map(|b| b.package.as_str()).collect();
        let build_ids: Vec<_> = builds.iter().map(|b| b.build_id).collect();
        debug!(?packages, ?build_ids, "starting builds");

        self.executor.spawn_builds(builds).await
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
