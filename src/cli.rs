// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::loader::ConfigOverrides;

/// Command-line arguments for `watch-build`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watch-build",
    version,
    about = "Rebuild the package of every changed source file.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `WatchBuild.toml` in the current working directory, if it
    /// exists.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Glob of files to watch, relative to the root. Repeatable; replaces
    /// `[watch].patterns`.
    #[arg(long = "pattern", value_name = "GLOB")]
    pub patterns: Vec<String>,

    /// Glob of files to ignore. Repeatable; replaces `[watch].exclude`.
    #[arg(long = "exclude", value_name = "GLOB")]
    pub excludes: Vec<String>,

    /// Build command template; `{package}` is replaced by the package path.
    #[arg(long, value_name = "TEMPLATE")]
    pub cmd: Option<String>,

    /// Per-package debounce window in milliseconds (0 disables).
    #[arg(long, value_name = "MS")]
    pub debounce: Option<u64>,

    /// Maximum number of builds running at once.
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// How long in-flight builds may run after Ctrl-C before being killed.
    #[arg(long, value_name = "MS")]
    pub grace_period: Option<u64>,

    /// Project root that package paths are relative to.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Leading directory removed from every package path.
    #[arg(long, value_name = "DIR")]
    pub strip_prefix: Option<PathBuf>,

    /// Execute the command directly instead of through the shell.
    #[arg(long)]
    pub no_shell: bool,

    /// Ignore change events that leave file content unchanged.
    #[arg(long)]
    pub use_hash: bool,

    /// Do not build every package at startup.
    #[arg(long)]
    pub no_initial_build: bool,

    /// Build every package once and exit, no watching.
    #[arg(long)]
    pub once: bool,

    /// Parse + validate, list packages and commands, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCH_BUILD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

impl CliArgs {
    /// Config values set on the command line. Flags that were not given
    /// leave the file value untouched.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            patterns: non_empty(&self.patterns),
            exclude: non_empty(&self.excludes),
            use_hash: self.use_hash.then_some(true),
            cmd: self.cmd.clone(),
            shell: self.no_shell.then_some(false),
            root: self.root.clone(),
            strip_prefix: self.strip_prefix.clone(),
            debounce_ms: self.debounce,
            max_concurrent: self.concurrency,
            grace_period_ms: self.grace_period,
            build_on_start: self.no_initial_build.then_some(false),
        }
    }
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_overrides_nothing() {
        let args = CliArgs::try_parse_from(["watch-build"]).unwrap();
        let o = args.overrides();
        assert!(o.patterns.is_none());
        assert!(o.cmd.is_none());
        assert!(o.shell.is_none());
        assert!(o.build_on_start.is_none());
        assert!(args.config.is_none());
    }

    #[test]
    fn flags_map_to_overrides() {
        let args = CliArgs::try_parse_from([
            "watch-build",
            "--pattern",
            "src/**/*.go",
            "--pattern",
            "cmd/**/*.go",
            "--exclude",
            "**/vendor/**",
            "--cmd",
            "go install example.com/{package}",
            "--debounce",
            "250",
            "--concurrency",
            "4",
            "--strip-prefix",
            "src",
            "--no-shell",
            "--no-initial-build",
            "--once",
        ])
        .unwrap();

        let o = args.overrides();
        assert_eq!(
            o.patterns,
            Some(vec!["src/**/*.go".to_string(), "cmd/**/*.go".to_string()])
        );
        assert_eq!(o.exclude, Some(vec!["**/vendor/**".to_string()]));
        assert_eq!(o.cmd.as_deref(), Some("go install example.com/{package}"));
        assert_eq!(o.debounce_ms, Some(250));
        assert_eq!(o.max_concurrent, Some(4));
        assert_eq!(o.strip_prefix, Some(PathBuf::from("src")));
        assert_eq!(o.shell, Some(false));
        assert_eq!(o.build_on_start, Some(false));
        assert!(args.once);
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        assert!(CliArgs::try_parse_from(["watch-build", "--log-level", "loud"]).is_err());
    }
}
