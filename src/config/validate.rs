// src/config/validate.rs

use std::path::{Component, Path, PathBuf};

use globset::Glob;

use crate::config::model::{BuildSection, ConfigFile, PackageSection, RawConfigFile};
use crate::errors::{Result, WatchBuildError};
use crate::exec::template::{has_placeholder, PACKAGE_PLACEHOLDER};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::WatchBuildError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let cmd = raw.build.cmd.unwrap_or_default();
        let build = BuildSection {
            cmd,
            shell: raw.build.shell,
        };
        let package = PackageSection {
            root: raw.package.root.unwrap_or_else(|| PathBuf::from(".")),
            strip_prefix: raw
                .package
                .strip_prefix
                .filter(|p| !p.as_os_str().is_empty()),
        };

        Ok(ConfigFile::new_unchecked(raw.watch, build, package, raw.config))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_patterns(cfg)?;
    validate_command(cfg)?;
    validate_package(cfg)?;
    validate_global_config(cfg)?;
    Ok(())
}

fn validate_patterns(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.patterns.is_empty() {
        return Err(WatchBuildError::ConfigError(
            "at least one watch pattern is required ([watch].patterns or --pattern)".to_string(),
        ));
    }

    for pat in cfg.watch.patterns.iter().chain(cfg.watch.exclude.iter()) {
        Glob::new(pat).map_err(|e| {
            WatchBuildError::ConfigError(format!("invalid glob pattern '{pat}': {e}"))
        })?;
    }
    Ok(())
}

fn validate_command(cfg: &RawConfigFile) -> Result<()> {
    let cmd = match cfg.build.cmd.as_deref() {
        Some(cmd) if !cmd.trim().is_empty() => cmd,
        _ => {
            return Err(WatchBuildError::ConfigError(
                "a build command is required ([build].cmd or --cmd)".to_string(),
            ));
        }
    };

    if !has_placeholder(cmd) {
        return Err(WatchBuildError::ConfigError(format!(
            "build command '{cmd}' must contain the {PACKAGE_PLACEHOLDER} placeholder"
        )));
    }
    Ok(())
}

fn validate_package(cfg: &RawConfigFile) -> Result<()> {
    if let Some(prefix) = cfg.package.strip_prefix.as_deref() {
        if !is_plain_relative(prefix) {
            return Err(WatchBuildError::ConfigError(format!(
                "[package].strip_prefix must be a plain relative path such as 'src' (got {:?})",
                prefix
            )));
        }
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.max_concurrent == 0 {
        return Err(WatchBuildError::ConfigError(
            "[config].max_concurrent must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn is_plain_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}
