// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::engine::core::CoreRuntime;
use crate::engine::{BuildOutcome, ScheduledBuild, TriggerReason};
use crate::types::PackageId;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Send these builds to the executor.
    StartBuilds(Vec<ScheduledBuild>),
    /// Request that the process exits (idle in `--once` mode, or shutdown
    /// finished).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn exit(mut commands: Vec<CoreCommand>) -> Self {
        commands.push(CoreCommand::RequestExit);
        Self {
            commands,
            keep_running: false,
        }
    }
}

impl CoreRuntime {
    /// Resolve a changed path and either queue a build or start/extend its
    /// debounce window.
    pub(crate) fn handle_path_changed(&mut self, path: PathBuf, now: Instant) -> CoreStep {
        if self.shutting_down {
            debug!(?path, "ignoring change event during shutdown");
            return CoreStep::running(Vec::new());
        }

        let package = match self.resolver.resolve(&path) {
            Ok(package) => package,
            Err(err) => {
                self.summary.skipped += 1;
                warn!(path = %path.display(), error = %err, "skipped change event");
                return CoreStep::running(Vec::new());
            }
        };

        if self.debouncer.is_enabled() {
            let coalesced = self.debouncer.record(package.clone(), now);
            debug!(package = %package, coalesced, "debouncing change");
            return CoreStep::running(Vec::new());
        }

        self.queue.enqueue(package);
        CoreStep::running(self.dispatch_ready())
    }

    pub(crate) fn handle_package_triggered(
        &mut self,
        package: PackageId,
        reason: TriggerReason,
    ) -> CoreStep {
        if self.shutting_down {
            debug!(package = %package, ?reason, "ignoring trigger during shutdown");
            return CoreStep::running(Vec::new());
        }

        debug!(package = %package, ?reason, "package triggered");
        self.queue.enqueue(package);
        CoreStep::running(self.dispatch_ready())
    }

    pub(crate) fn handle_startup_complete(&mut self) -> CoreStep {
        self.startup_complete = true;
        self.finish_step(Vec::new())
    }

    pub(crate) fn handle_debounce_elapsed(&mut self, now: Instant) -> CoreStep {
        let due = self.debouncer.take_due(now);
        if due.is_empty() || self.shutting_down {
            return CoreStep::running(Vec::new());
        }

        for package in due {
            self.queue.enqueue(package);
        }
        let commands = self.dispatch_ready();
        self.finish_step(commands)
    }

    /// Record the outcome, log it on a single line, and start whatever the
    /// freed slot allows.
    pub(crate) fn handle_build_finished(
        &mut self,
        package: PackageId,
        build_id: u64,
        outcome: BuildOutcome,
    ) -> CoreStep {
        if !self.queue.complete(&package) {
            warn!(package = %package, build_id, "completion for a build that was not in flight");
        }

        match &outcome {
            BuildOutcome::Success => {
                info!(package = %package, build_id, "build succeeded");
                self.summary.succeeded += 1;
            }
            BuildOutcome::Failed(code) => {
                warn!(package = %package, build_id, exit_code = *code, "build failed");
                self.summary.failed.push((package, outcome));
            }
            BuildOutcome::SpawnFailed(message) => {
                error!(package = %package, build_id, error = %message, "build could not be started");
                self.summary.failed.push((package, outcome));
            }
        }

        if self.shutting_down {
            if self.queue.in_flight_len() == 0 {
                info!("all in-flight builds finished; shutting down");
                return CoreStep::exit(Vec::new());
            }
            return CoreStep::running(Vec::new());
        }

        let commands = self.dispatch_ready();
        self.finish_step(commands)
    }

    /// Stop accepting work. Pending and debounced builds are dropped;
    /// in-flight builds are left to finish.
    pub(crate) fn handle_shutdown(&mut self) -> CoreStep {
        if !self.shutting_down {
            self.shutting_down = true;
            let dropped = self.queue.clear_pending() + self.debouncer.clear();
            info!(
                in_flight = self.queue.in_flight_len(),
                dropped,
                "shutdown requested"
            );
        }

        if self.queue.in_flight_len() == 0 {
            return CoreStep::exit(Vec::new());
        }
        CoreStep::running(Vec::new())
    }

    /// Start as many queued builds as the limits allow.
    fn dispatch_ready(&mut self) -> Vec<CoreCommand> {
        let ready = self.queue.take_ready();
        if ready.is_empty() {
            return Vec::new();
        }

        let builds: Vec<ScheduledBuild> = ready
            .into_iter()
            .map(|package| {
                let build_id = self.next_build_id;
                self.next_build_id += 1;
                ScheduledBuild {
                    cmd: self.command.render(&package),
                    mode: self.command.mode(),
                    package,
                    build_id,
                }
            })
            .collect();

        vec![CoreCommand::StartBuilds(builds)]
    }

    /// In `--once` mode, exit when startup seeding is done and nothing is
    /// left to do.
    fn finish_step(&mut self, commands: Vec<CoreCommand>) -> CoreStep {
        if self.options.exit_when_idle && self.startup_complete && self.is_idle() {
            return CoreStep::exit(commands);
        }
        CoreStep::running(commands)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use super::*;
    use crate::engine::{RuntimeEvent, RuntimeOptions};
    use crate::exec::template::BuildCommand;
    use crate::resolve::PackageResolver;
    use crate::types::LaunchMode;

    const ROOT: &str = "/home/u/proj";

    fn core(max_concurrent: usize, debounce_ms: u64, once: bool) -> CoreRuntime {
        CoreRuntime::new(
            PackageResolver::new(ROOT),
            BuildCommand::new("go install github.com/org/repo/{package}", LaunchMode::Shell),
            max_concurrent,
            Duration::from_millis(debounce_ms),
            RuntimeOptions {
                exit_when_idle: once,
            },
        )
    }

    fn changed(rel: &str) -> RuntimeEvent {
        RuntimeEvent::PathChanged {
            path: Path::new(ROOT).join(rel),
        }
    }

    fn finished(package: &PackageId, build_id: u64, outcome: BuildOutcome) -> RuntimeEvent {
        RuntimeEvent::BuildFinished {
            package: package.clone(),
            build_id,
            outcome,
        }
    }

    fn started(step: &CoreStep) -> Vec<ScheduledBuild> {
        step.commands
            .iter()
            .flat_map(|c| match c {
                CoreCommand::StartBuilds(builds) => builds.clone(),
                CoreCommand::RequestExit => Vec::new(),
            })
            .collect()
    }

    #[test]
    fn change_event_starts_rendered_build() {
        let mut core = core(1, 0, false);
        let step = core.step(changed("src/test/foo/bar_test.go"), Instant::now());

        let builds = started(&step);
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].package, "src/test/foo");
        assert_eq!(builds[0].cmd, "go install github.com/org/repo/src/test/foo");
        assert_eq!(builds[0].build_id, 1);
        assert!(step.keep_running);
    }

    #[test]
    fn unresolvable_path_is_skipped() {
        let mut core = core(1, 0, false);
        let step = core.step(changed("main.go"), Instant::now());
        assert!(started(&step).is_empty());
        assert!(step.keep_running);
        assert_eq!(core.summary().skipped, 1);

        let step = core.step(
            RuntimeEvent::PathChanged {
                path: PathBuf::from("/elsewhere/x/y.go"),
            },
            Instant::now(),
        );
        assert!(started(&step).is_empty());
        assert_eq!(core.summary().skipped, 2);
    }

    #[test]
    fn same_package_waits_for_in_flight_build() {
        let now = Instant::now();
        let mut core = core(4, 0, false);

        let first = started(&core.step(changed("a/x.go"), now));
        assert_eq!(first.len(), 1);

        // Second change for the same package is queued, not started.
        assert!(started(&core.step(changed("a/y.go"), now)).is_empty());

        let step = core.step(finished(&first[0].package, 1, BuildOutcome::Success), now);
        let second = started(&step);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].package, "a");
        assert_eq!(second[0].build_id, 2);
    }

    #[test]
    fn failure_does_not_block_other_packages() {
        let now = Instant::now();
        let mut core = core(1, 0, false);

        let a = started(&core.step(changed("a/x.go"), now));
        assert!(started(&core.step(changed("b/x.go"), now)).is_empty());

        let step = core.step(finished(&a[0].package, a[0].build_id, BuildOutcome::Failed(2)), now);
        let b = started(&step);
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].package, "b");
        assert!(step.keep_running);
        assert_eq!(core.summary().failed.len(), 1);
    }

    #[test]
    fn debounced_events_yield_one_build() {
        let t0 = Instant::now();
        let mut core = core(1, 100, false);

        assert!(started(&core.step(changed("a/x.go"), t0)).is_empty());
        assert!(
            started(&core.step(changed("a/x.go"), t0 + Duration::from_millis(20))).is_empty()
        );
        assert_eq!(core.next_deadline(), Some(t0 + Duration::from_millis(120)));

        assert!(started(&core.poll_timers(t0 + Duration::from_millis(110))).is_empty());
        let builds = started(&core.poll_timers(t0 + Duration::from_millis(120)));
        assert_eq!(builds.len(), 1);
        assert_eq!(core.next_deadline(), None);
    }

    #[test]
    fn startup_triggers_bypass_debounce() {
        let mut core = core(1, 500, false);
        let pkg = PackageResolver::new(ROOT)
            .resolve(Path::new("/home/u/proj/a/x.go"))
            .unwrap();
        let step = core.step(
            RuntimeEvent::PackageTriggered {
                package: pkg,
                reason: TriggerReason::Startup,
            },
            Instant::now(),
        );
        assert_eq!(started(&step).len(), 1);
    }

    #[test]
    fn once_mode_exits_after_startup_and_builds() {
        let now = Instant::now();
        let mut core = core(1, 0, true);

        let a = started(&core.step(changed("a/x.go"), now));
        let step = core.step(RuntimeEvent::StartupComplete, now);
        assert!(step.keep_running);

        let step = core.step(finished(&a[0].package, 1, BuildOutcome::Success), now);
        assert!(!step.keep_running);
        assert!(step.commands.contains(&CoreCommand::RequestExit));
    }

    #[test]
    fn once_mode_with_nothing_to_build_exits_immediately() {
        let mut core = core(1, 0, true);
        let step = core.step(RuntimeEvent::StartupComplete, Instant::now());
        assert!(!step.keep_running);
    }

    #[test]
    fn shutdown_waits_for_in_flight_and_drops_pending() {
        let now = Instant::now();
        let mut core = core(1, 0, false);

        let a = started(&core.step(changed("a/x.go"), now));
        core.step(changed("b/x.go"), now);

        let step = core.step(RuntimeEvent::ShutdownRequested, now);
        assert!(step.keep_running);
        assert!(core.is_shutting_down());

        // New events are ignored while draining.
        assert!(started(&core.step(changed("c/x.go"), now)).is_empty());

        let step = core.step(finished(&a[0].package, 1, BuildOutcome::Success), now);
        assert!(started(&step).is_empty());
        assert!(!step.keep_running);
    }

    #[test]
    fn shutdown_when_idle_exits_at_once() {
        let mut core = core(1, 0, false);
        let step = core.step(RuntimeEvent::ShutdownRequested, Instant::now());
        assert!(!step.keep_running);
    }

    #[test]
    fn spawn_failure_is_reported_in_summary() {
        let now = Instant::now();
        let mut core = core(1, 0, false);
        let a = started(&core.step(changed("a/x.go"), now));
        core.step(
            finished(&a[0].package, 1, BuildOutcome::SpawnFailed("not found".into())),
            now,
        );
        let err = core.summary().first_error().unwrap();
        assert!(err.to_string().contains("could not start build for package 'a'"));
    }
}
