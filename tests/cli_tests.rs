//! # CLI Integration Tests / CLI 集成测试
//!
//! Runs the `envmatrix` binary end to end against throwaway projects whose
//! "test suites" are plain `sh` commands.
//!
//! 针对临时项目端到端运行 `envmatrix` 二进制文件，这些项目的"测试套件"是普通的 `sh` 命令。
#![cfg(unix)]

mod common;

use assert_cmd::prelude::*;
use common::{create_invalid_toml, create_mixed_matrix, setup_test_environment, write_matrix};
use envmatrix::config::load_matrix_config;
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

fn envmatrix(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("envmatrix").unwrap();
    cmd.current_dir(temp_dir.path())
        .env("NO_COLOR", "1")
        .arg("--lang")
        .arg("en");
    cmd
}

/// A matrix over two versions that records which version ran, with lint
/// collaborators whose outcome is chosen by the caller.
fn lint_matrix(temp_dir: &TempDir, check: &str, fix: &str) {
    write_matrix(
        temp_dir,
        &format!(
            r#"
versions = ["1.0", "2.0"]

[test]
command = "touch {{project_dir}}/ran-{{version}}"

[lint]
check = ["{check}"]
fix = ["{fix}"]
"#
        ),
    );
}

#[cfg(test)]
mod matrix_tests {
    use super::*;

    /// A failing version fails the invocation, but every other version still
    /// runs and reports its own output.
    ///
    /// 一个失败的版本会使调用失败，但其他版本仍会运行并报告各自的输出。
    #[test]
    fn test_testall_reports_failure_of_one_version() {
        let temp_dir = setup_test_environment();
        create_mixed_matrix(&temp_dir);

        envmatrix(&temp_dir)
            .arg("testall")
            .assert()
            .failure()
            .stdout(predicate::str::contains("running 1.0"))
            .stdout(predicate::str::contains("running 2.0"))
            .stdout(predicate::str::contains("MATRIX FAILURES"))
            .stderr(predicate::str::contains("1 of 2 matrix task(s) failed."));
    }

    #[test]
    fn test_testall_success() {
        let temp_dir = setup_test_environment();
        write_matrix(
            &temp_dir,
            r#"
versions = ["1.0", "2.0"]

[test]
command = "echo ok-{version}"
"#,
        );

        envmatrix(&temp_dir)
            .arg("testall")
            .assert()
            .success()
            .stdout(predicate::str::contains("ok-1.0"))
            .stdout(predicate::str::contains("ok-2.0"))
            .stdout(predicate::str::contains("2/2 task(s) passed"))
            .stdout(predicate::str::contains("ALL MATRIX TASKS PASSED"));
    }

    #[test]
    fn test_test_runs_only_the_default_version() {
        let temp_dir = setup_test_environment();
        lint_matrix(&temp_dir, "true", "true");

        envmatrix(&temp_dir).arg("test").assert().success();

        assert!(temp_dir.path().join("ran-2.0").exists());
        assert!(!temp_dir.path().join("ran-1.0").exists());
    }

    #[test]
    fn test_test_passes_filter_verbatim() {
        let temp_dir = setup_test_environment();
        write_matrix(
            &temp_dir,
            r#"
versions = ["3.12"]

[test]
command = "printf '<%s>\n'"
filter_args = ["{filter}"]
"#,
        );

        envmatrix(&temp_dir)
            .arg("test")
            .arg("not slow and not network")
            .assert()
            .success()
            .stdout(predicate::str::contains("<not slow and not network>"));
    }

    #[test]
    fn test_hidden_single_version_entry_point() {
        let temp_dir = setup_test_environment();
        lint_matrix(&temp_dir, "true", "true");

        envmatrix(&temp_dir).arg("_test").arg("1.0").assert().success();

        assert!(temp_dir.path().join("ran-1.0").exists());
        assert!(!temp_dir.path().join("ran-2.0").exists());
    }

    #[test]
    fn test_hidden_entry_point_rejects_undeclared_version() {
        let temp_dir = setup_test_environment();
        lint_matrix(&temp_dir, "true", "true");

        envmatrix(&temp_dir)
            .arg("_test")
            .arg("9.9")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown version '9.9'"));
    }

    #[test]
    fn test_project_dir_and_config_flags() {
        let temp_dir = setup_test_environment();
        let project = temp_dir.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        let config = write_matrix(
            &temp_dir,
            r#"
versions = ["1.0"]

[test]
command = "touch ran-here"
"#,
        );

        let other = setup_test_environment();
        envmatrix(&other)
            .arg("--config")
            .arg(&config)
            .arg("--project-dir")
            .arg(&project)
            .arg("testall")
            .assert()
            .success();

        assert!(project.join("ran-here").exists());
    }
}

#[cfg(test)]
mod lint_tests {
    use super::*;

    /// A failing lint collaborator stops the invocation before any task runs.
    ///
    /// 失败的 lint 协作工具会在任何任务运行之前终止调用。
    #[test]
    fn test_check_lint_failure_skips_the_matrix() {
        let temp_dir = setup_test_environment();
        lint_matrix(&temp_dir, "sh -c 'exit 2'", "true");

        envmatrix(&temp_dir)
            .arg("check")
            .assert()
            .failure()
            .stderr(predicate::str::contains("exited with code 2"));

        assert!(!temp_dir.path().join("ran-1.0").exists());
        assert!(!temp_dir.path().join("ran-2.0").exists());
    }

    #[test]
    fn test_check_runs_matrix_after_passing_lint() {
        let temp_dir = setup_test_environment();
        lint_matrix(&temp_dir, "true", "false");

        envmatrix(&temp_dir)
            .arg("check")
            .assert()
            .success()
            .stdout(predicate::str::contains("Lint step passed."));

        assert!(temp_dir.path().join("ran-1.0").exists());
        assert!(temp_dir.path().join("ran-2.0").exists());
    }

    #[test]
    fn test_default_uses_fix_collaborators() {
        let temp_dir = setup_test_environment();
        lint_matrix(&temp_dir, "false", "touch {project_dir}/fixed");

        envmatrix(&temp_dir).arg("default").assert().success();

        assert!(temp_dir.path().join("fixed").exists());
        assert!(temp_dir.path().join("ran-2.0").exists());
    }

    #[test]
    fn test_no_subcommand_means_default() {
        let temp_dir = setup_test_environment();
        lint_matrix(&temp_dir, "false", "sh -c 'exit 5'");

        envmatrix(&temp_dir)
            .assert()
            .failure()
            .stderr(predicate::str::contains("exited with code 5"));

        assert!(!temp_dir.path().join("ran-1.0").exists());
    }
}

#[cfg(test)]
mod config_command_tests {
    use super::*;

    #[test]
    fn test_invalid_config_is_reported() {
        let temp_dir = setup_test_environment();
        create_invalid_toml(&temp_dir);

        envmatrix(&temp_dir)
            .arg("testall")
            .assert()
            .failure()
            .stderr(predicate::str::contains(
                "Failed to load the matrix configuration",
            ));
    }

    #[test]
    fn test_missing_config_is_reported() {
        let temp_dir = setup_test_environment();

        envmatrix(&temp_dir)
            .arg("testall")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read config file"));
    }

    #[test]
    fn test_list_prints_every_plan() {
        let temp_dir = setup_test_environment();
        write_matrix(
            &temp_dir,
            r#"
versions = ["3.11", "3.12"]

[test]
command = "pytest"

[[matrix]]
version = "3.11"
filter = "not slow"

[[matrix]]
version = "3.12"
"#,
        );

        envmatrix(&temp_dir)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("default (parallel) + lint fix"))
            .stdout(predicate::str::contains("check (parallel) + lint check"))
            .stdout(predicate::str::contains("test (sequential)"))
            .stdout(predicate::str::contains("testall (parallel)"))
            .stdout(predicate::str::contains("not slow"));
    }

    #[test]
    fn test_init_non_interactive_writes_a_valid_config() {
        let temp_dir = setup_test_environment();

        envmatrix(&temp_dir)
            .arg("init")
            .arg("--non-interactive")
            .assert()
            .success()
            .stdout(predicate::str::contains("Created"));

        let config = load_matrix_config(&temp_dir.path().join("Matrix.toml")).unwrap();
        assert_eq!(config.versions, vec!["3.11", "3.12", "3.13"]);
        assert_eq!(config.default_version(), "3.13");
        assert_eq!(config.full_matrix()[0].filter, "not slow");
        assert!(config.full_matrix()[2].filter.is_empty());
        assert!(!config.lint.check.is_empty());
    }
}
