// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the rendered build
//! commands, using `tokio::process::Command`, and reporting back to the
//! runtime via `RuntimeEvent::BuildFinished`.
//!
//! - [`template`] renders the `{package}` placeholder.
//! - [`executor_loop`] owns the background loop that tracks running builds.
//! - [`build_runner`] handles a single build process.
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod build_runner;
pub mod executor_loop;
pub mod template;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::{spawn_executor, ExecutorMessage};
pub use template::{BuildCommand, PACKAGE_PLACEHOLDER};
