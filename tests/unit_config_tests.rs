//! # Config Module Unit Tests / Config 模块单元测试
//!
//! Tests for parsing, defaults and validation of `Matrix.toml`.
//!
//! 测试 `Matrix.toml` 的解析、默认值和校验。

use envmatrix::config::{MatrixConfig, load_matrix_config, parse_matrix_config};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

const MINIMAL: &str = r#"
versions = ["3.11", "3.12"]

[test]
command = "pytest"
"#;

fn parse_err(content: &str) -> String {
    format!("{:#}", parse_matrix_config(content).unwrap_err())
}

#[cfg(test)]
mod parsing_tests {
    use super::*;

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse_matrix_config(MINIMAL).unwrap();

        assert_eq!(config.versions, vec!["3.11", "3.12"]);
        assert_eq!(config.language, None);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.jobs, None);
        assert!(config.environment.provision.is_empty());
        assert!(config.lint.check.is_empty());
        assert!(config.lint.fix.is_empty());
        assert_eq!(config.test.filter_args, vec!["-m", "{filter}"]);
    }

    #[test]
    fn test_default_version_is_newest_when_unset() {
        let config = parse_matrix_config(MINIMAL).unwrap();
        assert_eq!(config.default_version(), "3.12");
    }

    #[test]
    fn test_explicit_default_version() {
        let config = parse_matrix_config(
            r#"
versions = ["3.11", "3.12"]
default_version = "3.11"

[test]
command = "pytest"
"#,
        )
        .unwrap();
        assert_eq!(config.default_version(), "3.11");
    }

    #[test]
    fn test_full_matrix_without_entries_runs_every_version_unfiltered() {
        let config = parse_matrix_config(MINIMAL).unwrap();
        let matrix = config.full_matrix();

        assert_eq!(matrix.len(), 2);
        assert!(matrix.iter().all(|entry| entry.filter.is_empty()));
        assert_eq!(matrix[0].version, "3.11");
        assert_eq!(matrix[1].version, "3.12");
    }

    #[test]
    fn test_full_matrix_keeps_declaration_order_and_duplicates() {
        let config = parse_matrix_config(
            r#"
versions = ["3.11", "3.12"]

[test]
command = "pytest"

[[matrix]]
version = "3.12"

[[matrix]]
version = "3.11"
filter = "not slow"

[[matrix]]
version = "3.11"
filter = "slow"
"#,
        )
        .unwrap();

        let matrix = config.full_matrix();
        let rows: Vec<(&str, &str)> = matrix
            .iter()
            .map(|e| (e.version.as_str(), e.filter.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![("3.12", ""), ("3.11", "not slow"), ("3.11", "slow")]
        );
    }

    #[test]
    fn test_extras_for_merges_conditional_sets_without_duplicates() {
        let config = parse_matrix_config(
            r#"
versions = ["3.11", "3.12"]

[environment]
extras = ["test", "docs"]

[[environment.conditional_extras]]
versions = ["3.12"]
extras = ["numpy", "test"]

[test]
command = "pytest"
"#,
        )
        .unwrap();

        assert_eq!(config.extras_for("3.11"), vec!["test", "docs"]);
        assert_eq!(config.extras_for("3.12"), vec!["test", "docs", "numpy"]);
    }

    #[test]
    fn test_timeout_and_env_root() {
        let config = parse_matrix_config(
            r#"
versions = ["3.12"]
timeout_secs = 90
env_root = ".envs"

[test]
command = "pytest"
"#,
        )
        .unwrap();

        assert_eq!(config.timeout(), Some(Duration::from_secs(90)));
        assert_eq!(
            config.resolve_env_root(Path::new("/work/project")),
            Path::new("/work/project/.envs")
        );
    }

    #[test]
    fn test_env_root_defaults_to_temp_dir() {
        let config = parse_matrix_config(MINIMAL).unwrap();
        assert_eq!(
            config.resolve_env_root(Path::new("/work/project")),
            std::env::temp_dir()
        );
    }

    #[test]
    fn test_serialized_config_parses_back() {
        let config = parse_matrix_config(MINIMAL).unwrap();
        let text = toml::to_string_pretty(&config).unwrap();
        let reparsed: MatrixConfig = parse_matrix_config(&text).unwrap();
        assert_eq!(config, reparsed);
    }
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn test_empty_versions_rejected() {
        let err = parse_err(
            r#"
versions = []
[test]
command = "pytest"
"#,
        );
        assert!(err.contains("at least one runtime version"), "{err}");
    }

    #[test]
    fn test_duplicate_version_rejected() {
        let err = parse_err(
            r#"
versions = ["3.12", "3.12"]
[test]
command = "pytest"
"#,
        );
        assert!(err.contains("declared more than once"), "{err}");
    }

    #[test]
    fn test_undeclared_matrix_version_rejected() {
        let err = parse_err(
            r#"
versions = ["3.12"]
[test]
command = "pytest"

[[matrix]]
version = "2.7"
"#,
        );
        assert!(err.contains("'2.7'"), "{err}");
    }

    #[test]
    fn test_undeclared_default_version_rejected() {
        let err = parse_err(
            r#"
versions = ["3.12"]
default_version = "3.13"
[test]
command = "pytest"
"#,
        );
        assert!(err.contains("default_version"), "{err}");
    }

    #[test]
    fn test_filter_args_must_carry_placeholder() {
        let err = parse_err(
            r#"
versions = ["3.12"]
[test]
command = "pytest"
filter_args = ["-k"]
"#,
        );
        assert!(err.contains("{filter}"), "{err}");
    }

    #[test]
    fn test_blank_test_command_rejected() {
        let err = parse_err(
            r#"
versions = ["3.12"]
[test]
command = "   "
"#,
        );
        assert!(err.contains("test.command"), "{err}");
    }

    #[test]
    fn test_zero_timeout_and_jobs_rejected() {
        let timeout = parse_err(
            r#"
versions = ["3.12"]
timeout_secs = 0
[test]
command = "pytest"
"#,
        );
        assert!(timeout.contains("timeout_secs"), "{timeout}");

        let jobs = parse_err(
            r#"
versions = ["3.12"]
jobs = 0
[test]
command = "pytest"
"#,
        );
        assert!(jobs.contains("jobs"), "{jobs}");
    }

    #[test]
    fn test_missing_test_table_is_a_parse_error() {
        assert!(parse_matrix_config(r#"versions = ["3.12"]"#).is_err());
    }

    #[test]
    fn test_load_reports_path_of_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let err = format!("{:#}", load_matrix_config(&path).unwrap_err());
        assert!(err.contains("Failed to read config file"), "{err}");
    }

    #[test]
    fn test_load_reports_path_of_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Matrix.toml");
        fs::write(&path, "versions = [").unwrap();
        let err = format!("{:#}", load_matrix_config(&path).unwrap_err());
        assert!(err.contains("Invalid config file"), "{err}");
    }
}
