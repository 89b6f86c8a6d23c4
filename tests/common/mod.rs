#![allow(dead_code)]

pub use watch_build_test_utils::builders::ConfigFileBuilder;
pub use watch_build_test_utils::{init_tracing, with_timeout};

use std::error::Error;

pub type TestResult = Result<(), Box<dyn Error>>;
