#![allow(dead_code)]

use std::path::PathBuf;

use watch_build::config::{ConfigFile, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the same defaults as an empty `WatchBuild.toml`, with the
/// given command template and root `.`.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(cmd: &str) -> Self {
        let mut config = RawConfigFile::default();
        config.build.cmd = Some(cmd.to_string());
        config.package.root = Some(PathBuf::from("."));
        Self { config }
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.config.watch.patterns.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.config.watch.exclude.push(pattern.to_string());
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.config.watch.use_hash = val;
        self
    }

    pub fn shell(mut self, val: bool) -> Self {
        self.config.build.shell = val;
        self
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.package.root = Some(root.into());
        self
    }

    pub fn strip_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.config.package.strip_prefix = Some(prefix.into());
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.config.config.max_concurrent = n;
        self
    }

    pub fn grace_period_ms(mut self, ms: u64) -> Self {
        self.config.config.grace_period_ms = ms;
        self
    }

    pub fn build_on_start(mut self, val: bool) -> Self {
        self.config.config.build_on_start = val;
        self
    }

    /// The raw config, for tests exercising validation errors.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
