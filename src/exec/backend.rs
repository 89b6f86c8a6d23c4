// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender.
//! This makes it easy to swap in a fake executor in tests while keeping the
//! production executor implementation in [`executor_loop`](super::executor_loop).
//!
//! - `RealExecutorBackend` is the default implementation used by
//!   `watch-build`. It forwards scheduled builds to the background executor
//!   loop over an mpsc channel.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which packages were built and directly emits `BuildFinished` events.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::{mpsc, oneshot};

use crate::engine::{RuntimeEvent, ScheduledBuild};
use crate::errors::{Error, Result};

use super::executor_loop::{spawn_executor, ExecutorMessage};

/// Trait abstracting how scheduled builds are executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given builds for execution.
    ///
    /// Every build must eventually produce exactly one
    /// `RuntimeEvent::BuildFinished`, unless it is aborted.
    fn spawn_builds(
        &mut self,
        builds: Vec<ScheduledBuild>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Kill every build that is still running. Aborted builds do not report
    /// `BuildFinished`.
    fn abort_all(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }
}

/// Real executor backend used in production.
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ExecutorMessage>,
}

impl RealExecutorBackend {
    /// Create a new real executor backend, wiring it to the given runtime
    /// event sender.
    ///
    /// This spawns the background executor loop immediately.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let tx = spawn_executor(runtime_tx);
        Self { tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_builds(
        &mut self,
        builds: Vec<ScheduledBuild>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for build in builds {
                tx.send(ExecutorMessage::Run(build))
                    .await
                    .map_err(Error::from)?;
            }
            Ok(())
        })
    }

    fn abort_all(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();

        Box::pin(async move {
            let (done_tx, done_rx) = oneshot::channel();
            tx.send(ExecutorMessage::AbortAll(done_tx))
                .await
                .map_err(Error::from)?;
            // The loop may already be gone; nothing left to kill then.
            let _ = done_rx.await;
            Ok(())
        })
    }
}
