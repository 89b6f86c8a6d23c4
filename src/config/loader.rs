// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Values given on the command line; each `Some` replaces the file value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub patterns: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub use_hash: Option<bool>,
    pub cmd: Option<String>,
    pub shell: Option<bool>,
    pub root: Option<PathBuf>,
    pub strip_prefix: Option<PathBuf>,
    pub debounce_ms: Option<u64>,
    pub max_concurrent: Option<usize>,
    pub grace_period_ms: Option<u64>,
    pub build_on_start: Option<bool>,
}

impl ConfigOverrides {
    /// Apply the overrides on top of a raw (not yet validated) config.
    ///
    /// A relative `root` given here is kept relative, i.e. it is resolved
    /// against the current working directory, not the config file.
    pub fn apply(self, raw: &mut RawConfigFile) {
        if let Some(patterns) = self.patterns {
            raw.watch.patterns = patterns;
        }
        if let Some(exclude) = self.exclude {
            raw.watch.exclude = exclude;
        }
        if let Some(use_hash) = self.use_hash {
            raw.watch.use_hash = use_hash;
        }
        if let Some(cmd) = self.cmd {
            raw.build.cmd = Some(cmd);
        }
        if let Some(shell) = self.shell {
            raw.build.shell = shell;
        }
        if let Some(root) = self.root {
            raw.package.root = Some(root);
        }
        if let Some(prefix) = self.strip_prefix {
            raw.package.strip_prefix = Some(prefix);
        }
        if let Some(ms) = self.debounce_ms {
            raw.config.debounce_ms = ms;
        }
        if let Some(n) = self.max_concurrent {
            raw.config.max_concurrent = n;
        }
        if let Some(ms) = self.grace_period_ms {
            raw.config.grace_period_ms = ms;
        }
        if let Some(flag) = self.build_on_start {
            raw.config.build_on_start = flag;
        }
    }
}

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. A relative `[package].root` is resolved against the directory
/// containing the file.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let mut config: RawConfigFile = toml::from_str(&contents)?;

    let base = config_dir(path);
    config.package.root = Some(match config.package.root.take() {
        Some(root) if root.is_relative() => base.join(root),
        Some(root) => root,
        None => base,
    });

    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Load the config the way the binary does: file (if any) + CLI overrides,
/// then validate.
///
/// - `Some(path)`: the file must exist.
/// - `None`: [`default_config_path`] is used if present; otherwise the
///   config is built from the overrides alone.
pub fn load_with_overrides(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<ConfigFile> {
    let mut raw = match path {
        Some(path) => load_from_path(path)?,
        None => {
            let default_path = default_config_path();
            if default_path.is_file() {
                load_from_path(&default_path)?
            } else {
                RawConfigFile::default()
            }
        }
    };

    overrides.apply(&mut raw);
    ConfigFile::try_from(raw)
}

/// `WatchBuild.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("WatchBuild.toml")
}

/// Directory containing `config_path`, falling back to `.` for bare file
/// names like `WatchBuild.toml`.
fn config_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
