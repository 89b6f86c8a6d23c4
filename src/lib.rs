// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod resolve;
pub mod types;
pub mod watch;

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_with_overrides;
use crate::config::model::ConfigFile;
use crate::engine::{
    BuildSummary, CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason,
};
use crate::errors::{Result, WatchBuildError};
use crate::exec::{BuildCommand, RealExecutorBackend};
use crate::fs::{FileSystem, RealFileSystem};
use crate::resolve::PackageResolver;
use crate::types::{LaunchMode, PackageId};
use crate::watch::{collect_matching_files, ContentHashes, WatchContext, WatchPatterns};

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the config, then either prints the dry-run plan or
/// runs [`watch_build`]. With `--once`, any failed build becomes the
/// returned error.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.as_ref().map(PathBuf::from);
    let cfg = load_with_overrides(config_path.as_deref(), args.overrides())?;

    if args.dry_run {
        return print_dry_run(&cfg);
    }

    let summary = watch_build(&cfg, args.once).await?;

    if args.once {
        if let Some(err) = summary.first_error() {
            return Err(err);
        }
    }
    Ok(())
}

/// Run the watch-build loop for a validated config, shutting down on Ctrl-C.
///
/// Returns once shutdown completes or, with `once`, when every startup build
/// has finished.
pub async fn watch_build(cfg: &ConfigFile, once: bool) -> Result<BuildSummary> {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl+C received; shutting down"),
            Err(e) => {
                warn!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };
    watch_build_until(cfg, once, ctrl_c).await
}

/// Like [`watch_build`], but a graceful shutdown starts when `shutdown`
/// completes.
///
/// This wires together:
/// - startup enumeration of packages
/// - the runtime core and its async shell
/// - the process executor
/// - the file watcher (skipped when `once` is set)
/// - the shutdown trigger
pub async fn watch_build_until<F>(cfg: &ConfigFile, once: bool, shutdown: F) -> Result<BuildSummary>
where
    F: Future<Output = ()> + Send + 'static,
{
    let root = canonical_root(&cfg.package.root)?;
    let patterns = WatchPatterns::from_config(&cfg.watch)?;
    let resolver = resolver_for(cfg, root.clone());

    let fs = RealFileSystem;
    let files = collect_matching_files(&fs, &root, &patterns)?;
    let packages = startup_packages(&resolver, &files);
    info!(
        root = %root.display(),
        files = files.len(),
        packages = packages.len(),
        "enumerated watched files"
    );

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(256);

    // Process executor backend (real implementation in production).
    let executor = RealExecutorBackend::new(rt_tx.clone());

    // File watcher (disabled in --once mode). Started before the startup
    // builds so edits made while they run are not missed.
    let watcher_handle = if once {
        None
    } else {
        let hashes = cfg.watch.use_hash.then(|| {
            let mut hashes = ContentHashes::new();
            hashes.prime(&fs, &files);
            hashes
        });
        let ctx = WatchContext {
            root: root.clone(),
            patterns,
            hashes,
        };
        Some(crate::watch::spawn_watcher(ctx, rt_tx.clone())?)
    };

    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            shutdown.await;
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    // Seed startup builds from a separate task so a large tree cannot fill
    // the channel before the runtime starts reading.
    let seed = if cfg.config.build_on_start || once {
        packages
    } else {
        info!("initial build disabled; waiting for changes");
        Vec::new()
    };
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            for package in seed {
                let event = RuntimeEvent::PackageTriggered {
                    package,
                    reason: TriggerReason::Startup,
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(RuntimeEvent::StartupComplete).await;
        });
    }
    drop(rt_tx);

    let options = RuntimeOptions {
        exit_when_idle: once,
    };

    // Construct the pure core runtime (single source of truth for semantics).
    let core = CoreRuntime::from_config(cfg, resolver, options);

    // Construct the async IO shell around the core.
    let runtime = Runtime::new(core, rt_rx, executor, cfg.config.grace_period());
    let summary = runtime.run().await?;

    if let Some(handle) = watcher_handle {
        handle.stop();
    }

    info!(
        succeeded = summary.succeeded,
        failed = summary.failed.len(),
        skipped = summary.skipped,
        "watch-build finished"
    );
    Ok(summary)
}

/// Enumerate the packages the startup build covers: every file under `root`
/// matching `patterns`, resolved and deduplicated in sorted path order.
pub fn enumerate_startup_packages(
    fs: &dyn FileSystem,
    root: &Path,
    patterns: &WatchPatterns,
    resolver: &PackageResolver,
) -> Result<Vec<PackageId>> {
    let files = collect_matching_files(fs, root, patterns)?;
    Ok(startup_packages(resolver, &files))
}

/// Resolve `files`, skipping unresolvable ones, keeping the first
/// occurrence of each package.
fn startup_packages(resolver: &PackageResolver, files: &[PathBuf]) -> Vec<PackageId> {
    let mut seen = HashSet::new();
    let mut packages = Vec::new();

    for file in files {
        match resolver.resolve(file) {
            Ok(package) => {
                if seen.insert(package.clone()) {
                    packages.push(package);
                }
            }
            Err(err) => warn!(error = %err, "skipping file at startup"),
        }
    }
    packages
}

fn resolver_for(cfg: &ConfigFile, root: PathBuf) -> PackageResolver {
    let resolver = PackageResolver::new(root);
    match &cfg.package.strip_prefix {
        Some(prefix) => resolver.with_strip_prefix(prefix),
        None => resolver,
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf> {
    root.canonicalize().map_err(|e| {
        WatchBuildError::ConfigError(format!("package root {:?} is not usable: {e}", root))
    })
}

/// Dry-run output: print the settings and the command each startup package
/// would run.
fn print_dry_run(cfg: &ConfigFile) -> Result<()> {
    let root = canonical_root(&cfg.package.root)?;
    let patterns = WatchPatterns::from_config(&cfg.watch)?;
    let resolver = resolver_for(cfg, root.clone());
    let packages = enumerate_startup_packages(&RealFileSystem, &root, &patterns, &resolver)?;
    let command = BuildCommand::new(
        cfg.build.cmd.clone(),
        LaunchMode::from_shell_flag(cfg.build.shell),
    );

    println!("watch-build dry-run");
    println!("  root = {}", root.display());
    if let Some(prefix) = &cfg.package.strip_prefix {
        println!("  strip_prefix = {}", prefix.display());
    }
    println!("  patterns = {:?}", cfg.watch.patterns);
    if !cfg.watch.exclude.is_empty() {
        println!("  exclude = {:?}", cfg.watch.exclude);
    }
    println!("  cmd = {} ({:?})", command.template(), command.mode());
    println!("  debounce_ms = {}", cfg.config.debounce_ms);
    println!("  max_concurrent = {}", cfg.config.max_concurrent);
    println!("  grace_period_ms = {}", cfg.config.grace_period_ms);
    println!();

    println!("packages ({}):", packages.len());
    for package in &packages {
        println!("  - {package}");
        println!("      cmd: {}", command.render(package));
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_packages_keep_first_seen_order_and_dedupe() {
        let resolver = PackageResolver::new("/proj");
        let files = vec![
            PathBuf::from("/proj/src/a/one.go"),
            PathBuf::from("/proj/src/a/two.go"),
            PathBuf::from("/proj/src/b/one.go"),
            PathBuf::from("/proj/top.go"),
        ];

        let packages = startup_packages(&resolver, &files);
        assert_eq!(packages, vec![PackageId::new("src/a"), PackageId::new("src/b")]);
    }
}
