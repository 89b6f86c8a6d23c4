// src/config/mod.rs

//! Configuration loading and validation for watch-build.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and merge CLI overrides (`loader.rs`).
//! - Validate patterns, the command template and limits (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_with_overrides, ConfigOverrides};
pub use model::{
    BuildSection, ConfigFile, ConfigSection, PackageSection, RawBuildSection,
    RawConfigFile, RawPackageSection, WatchSection,
};
