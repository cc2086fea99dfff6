// Shared test helpers for integration tests
#![allow(dead_code)]

use envmatrix::config::{MatrixConfig, parse_matrix_config};
use envmatrix::execution::RunContext;
use envmatrix::infra::output::{OutputSink, SharedBuffer};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

pub fn setup_test_environment() -> TempDir {
    colored::control::set_override(false);
    tempdir().expect("Failed to create temporary directory")
}

/// Parses a configuration that is expected to be valid.
pub fn config_from(content: &str) -> MatrixConfig {
    parse_matrix_config(content).expect("test configuration should be valid")
}

/// Builds a run context whose blocks land in an inspectable buffer and whose
/// environments are created under `root/envs`.
pub fn capture_context(mut config: MatrixConfig, root: &Path) -> (RunContext, SharedBuffer) {
    config.env_root = Some(root.join("envs"));
    let buffer = SharedBuffer::new();
    let ctx = RunContext::new(config, root.to_path_buf(), "en")
        .with_sink(OutputSink::from_writer(buffer.clone()));
    (ctx, buffer)
}

/// Writes `content` as `Matrix.toml` into the directory.
pub fn write_matrix(temp_dir: &TempDir, content: &str) -> PathBuf {
    let matrix_path = temp_dir.path().join("Matrix.toml");
    fs::write(&matrix_path, content).expect("Failed to write Matrix.toml");
    matrix_path
}

/// Helper function to create an invalid TOML configuration
pub fn create_invalid_toml(temp_dir: &TempDir) -> PathBuf {
    write_matrix(
        temp_dir,
        r#"
versions = ["3.11"
[test]
command = "true"
"#,
    )
}

/// A two-version matrix whose first version passes and second version fails.
pub fn create_mixed_matrix(temp_dir: &TempDir) -> PathBuf {
    write_matrix(
        temp_dir,
        r#"
language = "en"
versions = ["1.0", "2.0"]

[test]
command = "sh -c 'echo running {version}; test {version} = 1.0'"
"#,
    )
}

/// Names of the entries currently inside a directory.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}
