// src/exec/build_runner.rs

//! Individual build process runner.

use std::process::Stdio;

use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::engine::{BuildOutcome, RuntimeEvent, ScheduledBuild};
use crate::types::LaunchMode;

/// Run a single build process and report its outcome with a
/// `BuildFinished` event.
///
/// - The child inherits stdout/stderr so compiler diagnostics reach the
///   terminal unchanged.
/// - A command that cannot be started is reported as
///   [`BuildOutcome::SpawnFailed`].
/// - On unix the child leads its own process group, so cancelling kills
///   everything the command forked, not just the shell.
/// - If the cancel channel fires, the child is killed and **no**
///   `BuildFinished` event is sent for that build. This also holds while
///   the runner is still waiting to deliver its result.
pub async fn run_build(
    build: ScheduledBuild,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    debug!(
        package = %build.package,
        build_id = build.build_id,
        cmd = %build.cmd,
        mode = ?build.mode,
        "starting build process"
    );

    let mut cmd = match command_for(&build) {
        Ok(cmd) => cmd,
        Err(message) => {
            report(&runtime_tx, &build, BuildOutcome::SpawnFailed(message), &mut cancel_rx).await;
            return;
        }
    };

    #[cfg(unix)]
    cmd.process_group(0);

    cmd.stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            report(
                &runtime_tx,
                &build,
                BuildOutcome::SpawnFailed(err.to_string()),
                &mut cancel_rx,
            )
            .await;
            return;
        }
    };

    tokio::select! {
        status_res = child.wait() => {
            let outcome = match status_res {
                Ok(status) if status.success() => BuildOutcome::Success,
                Ok(status) => BuildOutcome::Failed(status.code().unwrap_or(-1)),
                Err(err) => {
                    error!(
                        package = %build.package,
                        build_id = build.build_id,
                        error = %err,
                        "waiting for build process failed"
                    );
                    BuildOutcome::Failed(-1)
                }
            };
            report(&runtime_tx, &build, outcome, &mut cancel_rx).await;
        }

        cancel = &mut cancel_rx => {
            match cancel {
                Ok(()) => {
                    info!(
                        package = %build.package,
                        build_id = build.build_id,
                        "cancellation requested; killing build process"
                    );
                }
                Err(_) => {
                    debug!(
                        package = %build.package,
                        build_id = build.build_id,
                        "cancel channel closed without explicit cancellation"
                    );
                }
            }
            terminate(&mut child, &build).await;
        }
    }
}

/// Kill the child and everything it started, then reap it.
async fn terminate(child: &mut Child, build: &ScheduledBuild) {
    #[cfg(unix)]
    if let Err(e) = kill_process_group(child) {
        debug!(
            package = %build.package,
            build_id = build.build_id,
            error = %e,
            "failed to signal build process group"
        );
    }

    if let Err(e) = child.kill().await {
        warn!(
            package = %build.package,
            build_id = build.build_id,
            error = %e,
            "failed to kill build process on cancellation"
        );
    }
}

/// SIGKILL the group led by `child` (see `process_group(0)` above).
#[cfg(unix)]
fn kill_process_group(child: &Child) -> std::io::Result<()> {
    let Some(pid) = child.id() else {
        // Already reaped.
        return Ok(());
    };
    let pgid = libc::pid_t::try_from(pid)
        .map_err(|_| std::io::Error::other(format!("pid {pid} out of range")))?;
    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// Build the OS command for `build` according to its launch mode.
fn command_for(build: &ScheduledBuild) -> Result<Command, String> {
    match build.mode {
        LaunchMode::Shell => {
            let cmd = if cfg!(windows) {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(&build.cmd);
                c
            } else {
                let mut c = Command::new("sh");
                c.arg("-c").arg(&build.cmd);
                c
            };
            Ok(cmd)
        }
        LaunchMode::Direct => {
            let mut words = build.cmd.split_whitespace();
            let program = words
                .next()
                .ok_or_else(|| "build command is empty".to_string())?;
            let mut c = Command::new(program);
            c.args(words);
            Ok(c)
        }
    }
}

/// Deliver the outcome, unless the build is cancelled first. The runtime
/// stops reading its channel while it waits for an abort to finish, so a
/// blocked send must give way to the cancel signal.
async fn report(
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    build: &ScheduledBuild,
    outcome: BuildOutcome,
    cancel_rx: &mut oneshot::Receiver<()>,
) {
    let event = RuntimeEvent::BuildFinished {
        package: build.package.clone(),
        build_id: build.build_id,
        outcome,
    };
    tokio::select! {
        sent = runtime_tx.send(event) => {
            if sent.is_err() {
                debug!(
                    package = %build.package,
                    build_id = build.build_id,
                    "runtime gone; dropping build result"
                );
            }
        }
        _ = cancel_rx => {
            debug!(
                package = %build.package,
                build_id = build.build_id,
                "cancelled before the result was delivered; dropping it"
            );
        }
    }
}
