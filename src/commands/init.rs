//! # Matrix Initialization Module / 矩阵初始化模块
//!
//! This module provides an interactive command-line wizard that writes a
//! starter `Matrix.toml`: the runtime versions to test, how environments are
//! provisioned, the test command and the lint collaborators.
//!
//! 此模块提供一个交互式命令行向导，用于生成初始的 `Matrix.toml`：
//! 要测试的运行时版本、环境构建方式、测试命令以及 lint 协作工具。
//!
//! ## Features / 功能特性
//!
//! - **Provisioner Templates**: `uv`, `venv` or no provisioning at all
//! - **Slow-test Policy**: optionally narrow every version but the newest with a filter
//! - **Project Detection**: reads the project name from `pyproject.toml` when present
//! - **Overwrite Protection**: confirmation prompt before replacing an existing file
//!
//! - **构建模板**: `uv`、`venv` 或完全不构建环境
//! - **慢测试策略**: 可选地为除最新版本外的所有版本添加过滤器
//! - **项目检测**: 如果存在 `pyproject.toml`，则读取项目名称
//! - **覆盖保护**: 替换现有文件前进行确认

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, MultiSelect, Select, theme::ColorfulTheme};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::core::config::{
    EnvironmentSpec, LintSpec, MatrixConfig, MatrixEntry, TestSpec, parse_matrix_config,
};
use crate::infra::t;

const DEFAULT_VERSIONS: &str = "3.11, 3.12, 3.13";
const DEFAULT_SLOW_FILTER: &str = "not slow";

/// The `[project]` table of a `pyproject.toml`.
#[derive(Deserialize)]
struct Project {
    name: String,
}

#[derive(Deserialize)]
struct PyProject {
    project: Project,
}

/// How environments are built in the generated configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioner {
    /// `uv venv` followed by `uv pip install`.
    Uv,
    /// The interpreter's own `venv` module followed by `pip install`.
    Venv,
    /// No provisioning; the test command runs as-is.
    None,
}

impl Provisioner {
    fn provision_commands(self) -> Vec<String> {
        match self {
            Provisioner::Uv => vec![
                "uv venv --python {version} {env_dir}".to_string(),
                "uv pip install --python {env_dir} -e .[{extras}]".to_string(),
            ],
            Provisioner::Venv => vec![
                "python{version} -m venv {env_dir}".to_string(),
                "{env_dir}/bin/python -m pip install -e .[{extras}]".to_string(),
            ],
            Provisioner::None => vec![],
        }
    }

    fn test_command(self) -> String {
        match self {
            Provisioner::Uv | Provisioner::Venv => "{env_dir}/bin/python -m pytest".to_string(),
            Provisioner::None => "pytest".to_string(),
        }
    }
}

/// Builds a starter configuration.
///
/// When `slow_filter` is given, every version except the newest runs with that
/// filter, and the newest runs the full suite.
pub fn starter_matrix(
    versions: Vec<String>,
    provisioner: Provisioner,
    slow_filter: Option<&str>,
    lint: LintSpec,
) -> MatrixConfig {
    let matrix = match slow_filter {
        Some(filter) => {
            let newest = versions.len().saturating_sub(1);
            versions
                .iter()
                .enumerate()
                .map(|(i, version)| MatrixEntry {
                    version: version.clone(),
                    filter: if i == newest {
                        String::new()
                    } else {
                        filter.to_string()
                    },
                })
                .collect()
        }
        None => vec![],
    };

    MatrixConfig {
        language: None,
        versions,
        default_version: None,
        timeout_secs: None,
        jobs: None,
        env_root: None,
        environment: EnvironmentSpec {
            extras: vec!["test".to_string()],
            provision: provisioner.provision_commands(),
            conditional_extras: vec![],
        },
        test: TestSpec {
            command: provisioner.test_command(),
            filter_args: vec!["-m".to_string(), "{filter}".to_string()],
        },
        lint,
        matrix,
    }
}

fn ruff_lint() -> LintSpec {
    LintSpec {
        check: vec![
            "ruff check .".to_string(),
            "ruff format --check .".to_string(),
        ],
        fix: vec!["ruff check --fix .".to_string(), "ruff format .".to_string()],
    }
}

/// The configuration written by `init --non-interactive`.
pub fn default_matrix() -> MatrixConfig {
    starter_matrix(
        parse_versions(DEFAULT_VERSIONS),
        Provisioner::Uv,
        Some(DEFAULT_SLOW_FILTER),
        ruff_lint(),
    )
}

/// Splits a comma- or whitespace-separated list of versions.
pub fn parse_versions(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Runs the interactive wizard to generate a matrix configuration file.
///
/// 运行交互式向导以生成矩阵配置文件。
pub fn run_init_wizard(config_path: &Path, language: &str, non_interactive: bool) -> Result<()> {
    let theme = ColorfulTheme::default();

    if !non_interactive {
        println!("\n{}", t!("init.welcome", locale = language).cyan().bold());
        println!("{}", t!("init.description", locale = language));
    }

    if config_path.exists() && !non_interactive {
        let confirmation = Confirm::with_theme(&theme)
            .with_prompt(t!(
                "init.overwrite_prompt",
                locale = language,
                path = config_path.display()
            ))
            .default(false)
            .interact()
            .context(t!("init.user_confirmation_failed", locale = language).to_string())?;
        if !confirmation {
            println!("{}", t!("init.aborted", locale = language));
            return Ok(());
        }
    }

    if non_interactive {
        return write_config(config_path, &default_matrix(), language);
    }

    if let Ok(name) = detect_project_name(config_path.parent().unwrap_or(Path::new("."))) {
        println!(
            "{}",
            t!("init.detected_project", locale = language, name = name.green())
        );
    }

    let versions: String = Input::with_theme(&theme)
        .with_prompt(t!("init.versions_prompt", locale = language))
        .default(DEFAULT_VERSIONS.to_string())
        .interact_text()?;
    let versions = parse_versions(&versions);

    let provisioners = [Provisioner::Uv, Provisioner::Venv, Provisioner::None];
    let provisioner_labels = vec![
        t!("init.provisioner_uv", locale = language).to_string(),
        t!("init.provisioner_venv", locale = language).to_string(),
        t!("init.provisioner_none", locale = language).to_string(),
    ];
    let choice = Select::with_theme(&theme)
        .with_prompt(t!("init.provisioner_prompt", locale = language))
        .items(&provisioner_labels)
        .default(0)
        .interact()
        .context(t!("init.user_confirmation_failed", locale = language).to_string())?;
    let provisioner = provisioners[choice];

    let slow_filter = if Confirm::with_theme(&theme)
        .with_prompt(t!("init.slow_filter_prompt", locale = language))
        .default(true)
        .interact()?
    {
        let filter: String = Input::with_theme(&theme)
            .with_prompt(t!("init.filter_prompt", locale = language))
            .default(DEFAULT_SLOW_FILTER.to_string())
            .interact_text()?;
        Some(filter)
    } else {
        None
    };

    let lint_options = vec![
        t!("init.lint_ruff_check", locale = language).to_string(),
        t!("init.lint_ruff_format", locale = language).to_string(),
    ];
    let lint_selection = MultiSelect::with_theme(&theme)
        .with_prompt(t!("init.lint_prompt", locale = language))
        .items(&lint_options)
        .interact()
        .context(t!("init.user_confirmation_failed", locale = language).to_string())?;

    let ruff = ruff_lint();
    let mut lint = LintSpec::default();
    for i in lint_selection {
        lint.check.push(ruff.check[i].clone());
        lint.fix.push(ruff.fix[i].clone());
    }

    let matrix = starter_matrix(versions, provisioner, slow_filter.as_deref(), lint);
    write_config(config_path, &matrix, language)
}

fn write_config(path: &Path, matrix: &MatrixConfig, language: &str) -> Result<()> {
    let toml_string = toml::to_string_pretty(matrix)
        .context(t!("init.serialize_failed", locale = language).to_string())?;

    // Refuse to write something `run` would reject later.
    parse_matrix_config(&toml_string)?;

    fs::write(path, toml_string).with_context(|| {
        t!("init.write_failed", locale = language, path = path.display()).to_string()
    })?;

    println!(
        "\n{} {}",
        "✔".green(),
        t!("init.success_created", locale = language, path = path.display()).bold()
    );
    println!("{}", t!("init.usage_hint", locale = language));

    Ok(())
}

/// Reads the project name from `pyproject.toml` in `dir`.
fn detect_project_name(dir: &Path) -> Result<String> {
    let manifest_path = dir.join("pyproject.toml");
    let manifest_content = fs::read_to_string(&manifest_path)
        .with_context(|| format!("Failed to read {}", manifest_path.display()))?;
    let manifest: PyProject = toml::from_str(&manifest_content)
        .with_context(|| format!("Failed to parse {}", manifest_path.display()))?;
    Ok(manifest.project.name)
}
