//! Integration tests for codecell
//!
//! These tests run real toolchains and need `python3`, `node`, `javac` and
//! `java` on PATH.
//! Run with: cargo test -p codecell --features integration-tests

#![cfg(feature = "integration-tests")]

use std::fs;

use codecell::{Config, Dispatcher};

mod concurrency;
mod config_loading;
mod java;
mod javascript;
mod python;

const FIXTURES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

/// Helper to get fixture file content
pub(crate) fn fixture_source(name: &str) -> String {
    let path = format!("{FIXTURES_PATH}/sources/{name}");
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"))
}

/// Default configuration with a short wall clock budget
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.default_limits.wall_time_limit = Some(2.0);
    config
}

pub(crate) fn test_dispatcher() -> Dispatcher {
    Dispatcher::new(test_config())
}
