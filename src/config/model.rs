// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [watch]
/// patterns = ["src/test/**/*.go"]
///
/// [build]
/// cmd = "go install github.com/org/repo/{package}"
///
/// [package]
/// strip_prefix = "src"
///
/// [config]
/// debounce_ms = 200
/// max_concurrent = 2
/// ```
///
/// Every section is optional so that a config can be assembled entirely
/// from CLI flags; [`ConfigFile`] is the validated form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub build: RawBuildSection,

    #[serde(default)]
    pub package: RawPackageSection,

    #[serde(default)]
    pub config: ConfigSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Globs (relative to the package root) selecting the files to watch.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Globs removed from the watched set.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Skip change events whose file content has not actually changed.
    #[serde(default)]
    pub use_hash: bool,
}

/// `[build]` section as written in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawBuildSection {
    /// Command template containing `{package}`.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Run through the platform shell (`true`) or exec directly (`false`).
    #[serde(default = "default_shell")]
    pub shell: bool,
}

impl Default for RawBuildSection {
    fn default() -> Self {
        Self {
            cmd: None,
            shell: default_shell(),
        }
    }
}

fn default_shell() -> bool {
    true
}

/// `[package]` section as written in the file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPackageSection {
    /// Directory package identifiers are relative to. Relative values are
    /// resolved against the config file's directory.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Leading subdirectory (below `root`) that is not part of the
    /// identifier.
    #[serde(default)]
    pub strip_prefix: Option<PathBuf>,
}

/// `[config]` section: timing and scheduling knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Per-package debounce window; `0` disables coalescing.
    #[serde(default)]
    pub debounce_ms: u64,

    /// Maximum number of builds running at the same time.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// How long in-flight builds may keep running after shutdown is
    /// requested before they are killed.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Build every matching package once at startup.
    #[serde(default = "default_build_on_start")]
    pub build_on_start: bool,
}

fn default_max_concurrent() -> usize {
    1
}

fn default_grace_period_ms() -> u64 {
    5_000
}

fn default_build_on_start() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            debounce_ms: 0,
            max_concurrent: default_max_concurrent(),
            grace_period_ms: default_grace_period_ms(),
            build_on_start: default_build_on_start(),
        }
    }
}

impl ConfigSection {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

/// Validated `[build]` section.
#[derive(Debug, Clone)]
pub struct BuildSection {
    pub cmd: String,
    pub shell: bool,
}

/// Validated `[package]` section.
#[derive(Debug, Clone)]
pub struct PackageSection {
    pub root: PathBuf,
    pub strip_prefix: Option<PathBuf>,
}

/// Validated configuration.
///
/// Obtain one via `ConfigFile::try_from(raw)` or
/// [`crate::config::loader::load_and_validate`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub watch: WatchSection,
    pub build: BuildSection,
    pub package: PackageSection,
    pub config: ConfigSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        watch: WatchSection,
        build: BuildSection,
        package: PackageSection,
        config: ConfigSection,
    ) -> Self {
        Self {
            watch,
            build,
            package,
            config,
        }
    }
}
