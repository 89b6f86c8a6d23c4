use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use watch_build::engine::{BuildOutcome, RuntimeEvent, ScheduledBuild};
use watch_build::errors::Result;
use watch_build::exec::ExecutorBackend;

/// A fake executor that:
/// - records the rendered command of every build it was handed
/// - reports `BuildFinished` for each build, `Failed(1)` for packages in
///   `fail`, `Success` otherwise.
pub struct RecordingExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<ScheduledBuild>>>,
    fail: HashSet<String>,
}

impl RecordingExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<ScheduledBuild>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            fail: HashSet::new(),
        }
    }

    /// Make every build of `package` exit with code 1.
    pub fn failing(mut self, package: &str) -> Self {
        self.fail.insert(package.to_string());
        self
    }
}

impl ExecutorBackend for RecordingExecutor {
    fn spawn_builds(
        &mut self,
        builds: Vec<ScheduledBuild>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let fail = self.fail.clone();

        Box::pin(async move {
            for b in builds {
                executed.lock().unwrap().push(b.clone());

                let outcome = if fail.contains(b.package.as_str()) {
                    BuildOutcome::Failed(1)
                } else {
                    BuildOutcome::Success
                };

                tx.send(RuntimeEvent::BuildFinished {
                    package: b.package.clone(),
                    build_id: b.build_id,
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}

/// Observations made by [`SlowExecutor`].
#[derive(Debug, Default)]
pub struct SlowExecutorLog {
    /// Packages in the order their builds started.
    pub started: Vec<String>,
    /// Packages whose build reported completion.
    pub finished: Vec<String>,
    /// Highest number of builds running at the same time.
    pub max_parallel: usize,
    /// Set if a build started while another build of the same package was
    /// still running.
    pub overlap: bool,
    /// Number of `abort_all` calls.
    pub aborts: usize,
    running: HashMap<String, usize>,
}

/// A fake executor whose builds take `duration` of (Tokio) time each.
///
/// Used to observe concurrency limits, per-package exclusion and the
/// shutdown grace period.
pub struct SlowExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    duration: Duration,
    log: Arc<Mutex<SlowExecutorLog>>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl SlowExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        duration: Duration,
        log: Arc<Mutex<SlowExecutorLog>>,
    ) -> Self {
        Self {
            runtime_tx,
            duration,
            log,
            tasks: Vec::new(),
        }
    }
}

impl ExecutorBackend for SlowExecutor {
    fn spawn_builds(
        &mut self,
        builds: Vec<ScheduledBuild>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for b in builds {
                {
                    let mut log = self.log.lock().unwrap();
                    let package = b.package.to_string();
                    log.started.push(package.clone());
                    let count = log.running.entry(package).or_insert(0);
                    *count += 1;
                    if *count > 1 {
                        log.overlap = true;
                    }
                    let total: usize = log.running.values().sum();
                    log.max_parallel = log.max_parallel.max(total);
                }

                let tx = self.runtime_tx.clone();
                let log = Arc::clone(&self.log);
                let duration = self.duration;
                self.tasks.push(tokio::spawn(async move {
                    tokio::time::sleep(duration).await;
                    {
                        let mut log = log.lock().unwrap();
                        let package = b.package.to_string();
                        if let Some(count) = log.running.get_mut(&package) {
                            *count -= 1;
                        }
                        log.finished.push(package);
                    }
                    let _ = tx
                        .send(RuntimeEvent::BuildFinished {
                            package: b.package,
                            build_id: b.build_id,
                            outcome: BuildOutcome::Success,
                        })
                        .await;
                }));
            }
            Ok(())
        })
    }

    fn abort_all(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.log.lock().unwrap().aborts += 1;
            for task in self.tasks.drain(..) {
                task.abort();
            }
            Ok(())
        })
    }
}
