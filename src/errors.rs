// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

/// Why a filesystem path could not be mapped to a package identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidPathError {
    #[error("path {path:?} is not inside root {root:?}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("path {path:?} is not inside package prefix {prefix:?}")]
    MissingPrefix { path: PathBuf, prefix: PathBuf },

    #[error("path {path:?} has no package directory above its file name")]
    NoPackageDir { path: PathBuf },

    #[error("path {path:?} contains an unsupported component")]
    Unsupported { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum WatchBuildError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(#[from] InvalidPathError),

    #[error("could not start build for package '{package}': {message}")]
    BuildInvocation { package: String, message: String },

    #[error("build for package '{package}' exited with code {code}")]
    NonZeroExit { package: String, code: i32 },

    #[error("could not establish file watch: {0}")]
    WatchSubscription(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WatchBuildError>;
