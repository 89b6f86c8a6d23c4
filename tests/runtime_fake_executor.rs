// tests/runtime_fake_executor.rs

mod common;
use crate::common::{init_tracing, with_timeout, TestResult};

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use watch_build::engine::{
    BuildOutcome, CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason,
};
use watch_build::errors::WatchBuildError;
use watch_build::exec::BuildCommand;
use watch_build::resolve::PackageResolver;
use watch_build::types::{LaunchMode, PackageId};
use watch_build_test_utils::fake_executor::{RecordingExecutor, SlowExecutor, SlowExecutorLog};

const ROOT: &str = "/home/u/proj";

fn core(max_concurrent: usize, debounce: Duration, once: bool) -> CoreRuntime {
    CoreRuntime::new(
        PackageResolver::new(ROOT),
        BuildCommand::new("go install github.com/org/repo/{package}", LaunchMode::Shell),
        max_concurrent,
        debounce,
        RuntimeOptions {
            exit_when_idle: once,
        },
    )
}

fn changed(rel: &str) -> RuntimeEvent {
    RuntimeEvent::PathChanged {
        path: PathBuf::from(ROOT).join(rel),
    }
}

fn startup(package: &str) -> RuntimeEvent {
    RuntimeEvent::PackageTriggered {
        package: PackageId::new(package),
        reason: TriggerReason::Startup,
    }
}

#[tokio::test]
async fn failure_in_one_package_does_not_block_others() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = RecordingExecutor::new(tx.clone(), Arc::clone(&executed)).failing("src/a");

    tx.send(startup("src/a")).await?;
    tx.send(startup("src/b")).await?;
    tx.send(RuntimeEvent::StartupComplete).await?;

    let runtime = Runtime::new(core(1, Duration::ZERO, true), rx, executor, Duration::from_secs(1));
    let summary = with_timeout(runtime.run()).await?;

    let cmds: Vec<String> = executed.lock().unwrap().iter().map(|b| b.cmd.clone()).collect();
    assert_eq!(
        cmds,
        vec![
            "go install github.com/org/repo/src/a",
            "go install github.com/org/repo/src/b",
        ]
    );

    assert_eq!(summary.succeeded, 1);
    assert_eq!(
        summary.failed,
        vec![(PackageId::new("src/a"), BuildOutcome::Failed(1))]
    );
    match summary.first_error() {
        Some(WatchBuildError::NonZeroExit { package, code }) => {
            assert_eq!(package, "src/a");
            assert_eq!(code, 1);
        }
        other => panic!("expected NonZeroExit, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn change_events_resolve_to_package_commands() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = RecordingExecutor::new(tx.clone(), Arc::clone(&executed));

    tx.send(changed("src/test/foo/bar_test.go")).await?;
    // Directly under the root: no package, skipped.
    tx.send(changed("main.go")).await?;
    tx.send(RuntimeEvent::StartupComplete).await?;

    let runtime = Runtime::new(core(1, Duration::ZERO, true), rx, executor, Duration::from_secs(1));
    let summary = with_timeout(runtime.run()).await?;

    let executed = executed.lock().unwrap();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].package, "src/test/foo");
    assert_eq!(executed[0].cmd, "go install github.com/org/repo/src/test/foo");
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.succeeded, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn builds_respect_concurrency_and_never_overlap_per_package() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let log = Arc::new(Mutex::new(SlowExecutorLog::default()));
    let executor = SlowExecutor::new(tx.clone(), Duration::from_millis(500), Arc::clone(&log));

    for rel in [
        "src/a/one.go",
        "src/a/two.go",
        "src/b/one.go",
        "src/c/one.go",
        "src/a/three.go",
    ] {
        tx.send(changed(rel)).await?;
    }
    tx.send(RuntimeEvent::StartupComplete).await?;

    let runtime = Runtime::new(core(2, Duration::ZERO, true), rx, executor, Duration::from_secs(1));
    let summary = with_timeout(runtime.run()).await?;

    let log = log.lock().unwrap();
    assert!(!log.overlap, "two builds of one package ran at once");
    assert_eq!(log.max_parallel, 2);
    assert_eq!(log.started.iter().filter(|p| *p == "src/a").count(), 3);
    assert_eq!(log.started.len(), 5);
    assert_eq!(summary.succeeded, 5);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn serialized_by_default() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let log = Arc::new(Mutex::new(SlowExecutorLog::default()));
    let executor = SlowExecutor::new(tx.clone(), Duration::from_millis(200), Arc::clone(&log));

    for package in ["src/a", "src/b", "src/c"] {
        tx.send(startup(package)).await?;
    }
    tx.send(RuntimeEvent::StartupComplete).await?;

    let runtime = Runtime::new(core(1, Duration::ZERO, true), rx, executor, Duration::from_secs(1));
    with_timeout(runtime.run()).await?;

    let log = log.lock().unwrap();
    assert_eq!(log.max_parallel, 1);
    assert_eq!(log.started, vec!["src/a", "src/b", "src/c"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn rapid_changes_within_window_build_once() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = RecordingExecutor::new(tx.clone(), Arc::clone(&executed));

    let runtime = Runtime::new(
        core(1, Duration::from_millis(100), true),
        rx,
        executor,
        Duration::from_secs(1),
    );
    let handle = tokio::spawn(runtime.run());

    tx.send(changed("src/a/x.go")).await?;
    tokio::time::sleep(Duration::from_millis(40)).await;
    tx.send(changed("src/a/y.go")).await?;
    tx.send(changed("src/b/z.go")).await?;
    tokio::time::sleep(Duration::from_millis(40)).await;
    tx.send(changed("src/a/x.go")).await?;
    tx.send(RuntimeEvent::StartupComplete).await?;

    let summary = with_timeout(handle).await??;

    let mut packages: Vec<String> = executed
        .lock()
        .unwrap()
        .iter()
        .map(|b| b.package.to_string())
        .collect();
    packages.sort();
    assert_eq!(packages, vec!["src/a", "src/b"]);
    assert_eq!(summary.succeeded, 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn changes_in_separate_windows_build_twice() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = RecordingExecutor::new(tx.clone(), Arc::clone(&executed));

    let runtime = Runtime::new(
        core(1, Duration::from_millis(100), false),
        rx,
        executor,
        Duration::from_secs(1),
    );
    let handle = tokio::spawn(runtime.run());

    tx.send(RuntimeEvent::StartupComplete).await?;
    tx.send(changed("src/a/x.go")).await?;
    tokio::time::sleep(Duration::from_millis(250)).await;
    tx.send(changed("src/a/x.go")).await?;
    tokio::time::sleep(Duration::from_millis(250)).await;
    tx.send(RuntimeEvent::ShutdownRequested).await?;

    let summary = with_timeout(handle).await??;
    assert_eq!(executed.lock().unwrap().len(), 2);
    assert_eq!(summary.succeeded, 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_builds_that_finish_within_grace() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let log = Arc::new(Mutex::new(SlowExecutorLog::default()));
    let executor = SlowExecutor::new(tx.clone(), Duration::from_millis(300), Arc::clone(&log));

    let runtime = Runtime::new(core(1, Duration::ZERO, false), rx, executor, Duration::from_secs(5));
    let handle = tokio::spawn(runtime.run());

    tx.send(startup("src/a")).await?;
    tx.send(startup("src/b")).await?;
    tx.send(RuntimeEvent::StartupComplete).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(RuntimeEvent::ShutdownRequested).await?;

    let summary = with_timeout(handle).await??;

    let log = log.lock().unwrap();
    // `src/b` was still pending and is dropped.
    assert_eq!(log.started, vec!["src/a"]);
    assert_eq!(log.finished, vec!["src/a"]);
    assert_eq!(log.aborts, 0);
    assert_eq!(summary.succeeded, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_kills_builds_after_grace_period() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let log = Arc::new(Mutex::new(SlowExecutorLog::default()));
    let executor = SlowExecutor::new(tx.clone(), Duration::from_secs(60), Arc::clone(&log));

    let runtime = Runtime::new(core(1, Duration::ZERO, false), rx, executor, Duration::from_secs(1));
    let handle = tokio::spawn(runtime.run());

    tx.send(startup("src/a")).await?;
    tx.send(RuntimeEvent::StartupComplete).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = tokio::time::Instant::now();
    tx.send(RuntimeEvent::ShutdownRequested).await?;
    let summary = with_timeout(handle).await??;

    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(started.elapsed() < Duration::from_secs(60));

    let log = log.lock().unwrap();
    assert_eq!(log.aborts, 1);
    assert!(log.finished.is_empty());
    assert_eq!(summary.succeeded, 0);
    assert!(summary.failed.is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn events_after_shutdown_are_ignored() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let log = Arc::new(Mutex::new(SlowExecutorLog::default()));
    let executor = SlowExecutor::new(tx.clone(), Duration::from_millis(300), Arc::clone(&log));

    let runtime = Runtime::new(core(2, Duration::ZERO, false), rx, executor, Duration::from_secs(5));
    let handle = tokio::spawn(runtime.run());

    tx.send(startup("src/a")).await?;
    tx.send(RuntimeEvent::StartupComplete).await?;
    tokio::time::sleep(Duration::from_millis(10)).await;
    tx.send(RuntimeEvent::ShutdownRequested).await?;
    tx.send(changed("src/b/x.go")).await?;

    with_timeout(handle).await??;
    assert_eq!(log.lock().unwrap().started, vec!["src/a"]);
    Ok(())
}
