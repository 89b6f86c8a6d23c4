// src/exec/executor_loop.rs

//! Main executor loop that manages running build processes.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, ScheduledBuild};
use crate::exec::build_runner::run_build;
use crate::types::PackageId;

/// Requests accepted by the executor loop.
#[derive(Debug)]
pub enum ExecutorMessage {
    /// Start one build process.
    Run(ScheduledBuild),
    /// Kill every running build, then acknowledge on the sender.
    AbortAll(oneshot::Sender<()>),
}

/// Internal handle for a currently-running build process.
///
/// - `cancel` asks the runner to kill its child.
/// - `handle` is the Tokio task that is actually running the command.
struct ActiveBuild {
    package: PackageId,
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

/// Spawn the background executor loop.
///
/// Each scheduled build is executed in its own Tokio task. The core never
/// schedules two builds for the same package at once; the loop only warns if
/// that ever happens.
pub fn spawn_executor(runtime_tx: mpsc::Sender<RuntimeEvent>) -> mpsc::Sender<ExecutorMessage> {
    let (tx, mut rx) = mpsc::channel::<ExecutorMessage>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        // Keyed by build id.
        let mut active: HashMap<u64, ActiveBuild> = HashMap::new();

        while let Some(message) = rx.recv().await {
            active.retain(|_, build| !build.handle.is_finished());

            match message {
                ExecutorMessage::Run(build) => {
                    handle_scheduled_build(build, &mut active, &runtime_tx);
                }
                ExecutorMessage::AbortAll(done) => {
                    abort_all(&mut active).await;
                    let _ = done.send(());
                }
            }
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}

/// Handle a newly scheduled build.
fn handle_scheduled_build(
    build: ScheduledBuild,
    active: &mut HashMap<u64, ActiveBuild>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) {
    if active.values().any(|a| a.package == build.package) {
        warn!(
            package = %build.package,
            build_id = build.build_id,
            "package already has a running build; starting another anyway"
        );
    }

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let rt_tx = runtime_tx.clone();
    let build_id = build.build_id;
    let package = build.package.clone();

    let handle = tokio::spawn(async move {
        run_build(build, rt_tx, cancel_rx).await;
        debug!(build_id, "build runner future finished");
    });

    active.insert(
        build_id,
        ActiveBuild {
            package,
            cancel: Some(cancel_tx),
            handle,
        },
    );
}

/// Cancel every running build and wait for the runners to reap their
/// children.
async fn abort_all(active: &mut HashMap<u64, ActiveBuild>) {
    if active.is_empty() {
        return;
    }

    info!(count = active.len(), "aborting running builds");

    for (build_id, mut build) in active.drain() {
        match build.cancel.take() {
            Some(cancel) => {
                if cancel.send(()).is_err() {
                    debug!(
                        package = %build.package,
                        build_id,
                        "build already finished while cancelling"
                    );
                }
            }
            None => {
                debug!(package = %build.package, build_id, "build already cancelled");
            }
        }

        if let Err(err) = build.handle.await {
            warn!(
                package = %build.package,
                build_id,
                error = %err,
                "build runner task failed while aborting"
            );
        }
    }
}
