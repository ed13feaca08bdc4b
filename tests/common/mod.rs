#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use kaizenlap_analytics::config::Config;

pub fn fixture_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/data")
}

/// configuration with a fresh document store inside `dir`
pub fn test_config(dir: &TempDir, data_dir: PathBuf) -> Config {
    Config {
        database_url: dir.path().join("documents.sqlite").display().to_string(),
        data_dir,
        log_file: None,
        ..Config::default()
    }
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
