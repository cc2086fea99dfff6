//! # Matrix Configuration Module / 矩阵配置模块
//!
//! This module defines the on-disk configuration of a test matrix (`Matrix.toml`)
//! and loads it once at startup into an immutable [`MatrixConfig`].
//!
//! 此模块定义测试矩阵的磁盘配置（`Matrix.toml`），
//! 并在启动时将其一次性加载为不可变的 [`MatrixConfig`]。

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The placeholder substituted with a task's filter inside `filter_args`.
pub const FILTER_PLACEHOLDER: &str = "{filter}";

/// Represents the entire matrix configuration, loaded from a TOML file.
/// 代表从 TOML 文件加载的整个矩阵配置。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MatrixConfig {
    /// The language for the runner's output messages (e.g., "en", "zh-CN").
    /// The `--lang` flag takes precedence over this value.
    ///
    /// 运行器输出消息的语言（例如 "en", "zh-CN"）。
    /// `--lang` 参数优先于此值。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Every runtime version the project supports, oldest first.
    /// 项目支持的所有运行时版本，从旧到新排列。
    pub versions: Vec<String>,

    /// The version used by the single-task `test` command.
    /// Defaults to the last entry of `versions`.
    ///
    /// 单任务 `test` 命令使用的版本。默认为 `versions` 的最后一项。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_version: Option<String>,

    /// An optional timeout in seconds applied to each task as a whole.
    /// Without it, a hung subprocess blocks its task indefinitely.
    ///
    /// 应用于每个任务整体的可选超时时间（秒）。
    /// 未设置时，挂起的子进程会无限期阻塞其任务。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Maximum number of tasks running at once in a parallel run.
    /// Defaults to running every task of the matrix at the same time.
    ///
    /// 并行运行时同时执行的最大任务数。默认同时运行矩阵中的所有任务。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    /// Directory under which per-task environments are created,
    /// relative to the project root. Defaults to the system temp directory.
    ///
    /// 创建每个任务环境的目录（相对于项目根目录）。默认为系统临时目录。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_root: Option<PathBuf>,

    /// How an environment is provisioned.
    /// 如何构建环境。
    #[serde(default)]
    pub environment: EnvironmentSpec,

    /// The test command run inside each environment.
    /// 在每个环境中运行的测试命令。
    pub test: TestSpec,

    /// The lint/format collaborators used by `check` and `default`.
    /// `check` 与 `default` 使用的 lint/格式化协作工具。
    #[serde(default)]
    pub lint: LintSpec,

    /// The full matrix in declaration order. When empty, every declared
    /// version runs once without a filter.
    ///
    /// 按声明顺序排列的完整矩阵。为空时，每个声明的版本不带过滤器运行一次。
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matrix: Vec<MatrixEntry>,
}

/// Describes the commands that build a fresh environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EnvironmentSpec {
    /// Extras installed for every version, exposed to templates as `{extras}`.
    #[serde(default)]
    pub extras: Vec<String>,
    /// Commands run in order inside the project directory.
    #[serde(default)]
    pub provision: Vec<String>,
    /// Extras installed only for some versions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditional_extras: Vec<ConditionalExtras>,
}

/// A set of extras that only applies to the listed versions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConditionalExtras {
    pub versions: Vec<String>,
    pub extras: Vec<String>,
}

/// The test runner invocation.
///
/// Commands are split with shell quoting rules, but `$VAR` and `~` are
/// expanded before quotes are read: a variable set in the runner's own
/// environment is replaced even inside single quotes. Variables it does not
/// know are left as written, so `sh -c 'echo $HOME_OF_CHILD'` still reaches
/// the child shell untouched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TestSpec {
    /// The command template, e.g. `"{env_dir}/bin/python -m pytest"`.
    pub command: String,
    /// Arguments appended when a task carries a non-empty filter.
    /// One of them must contain `{filter}`.
    #[serde(default = "default_filter_args")]
    pub filter_args: Vec<String>,
}

fn default_filter_args() -> Vec<String> {
    vec!["-m".to_string(), FILTER_PLACEHOLDER.to_string()]
}

/// External formatter/linter commands. Templates follow the same expansion
/// and quoting rules as [`TestSpec::command`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LintSpec {
    /// Commands that only report problems (used by `check`).
    #[serde(default)]
    pub check: Vec<String>,
    /// Commands that rewrite files in place (used by `default`).
    #[serde(default)]
    pub fix: Vec<String>,
}

/// One (version, filter) row of the full matrix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MatrixEntry {
    pub version: String,
    #[serde(default)]
    pub filter: String,
}

impl MatrixConfig {
    /// Checks the cross-field rules that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.versions.is_empty() {
            bail!("`versions` must declare at least one runtime version.");
        }

        let mut seen = HashSet::new();
        for version in &self.versions {
            if version.trim().is_empty() {
                bail!("`versions` contains an empty version identifier.");
            }
            if !seen.insert(version.as_str()) {
                bail!("Version '{}' is declared more than once.", version);
            }
        }

        if let Some(default) = &self.default_version {
            self.ensure_declared(default, "default_version")?;
        }
        for entry in &self.matrix {
            self.ensure_declared(&entry.version, "[[matrix]]")?;
        }
        for conditional in &self.environment.conditional_extras {
            for version in &conditional.versions {
                self.ensure_declared(version, "[[environment.conditional_extras]]")?;
            }
        }

        if self.test.command.trim().is_empty() {
            bail!("`test.command` must not be empty.");
        }
        if !self
            .test
            .filter_args
            .iter()
            .any(|arg| arg.contains(FILTER_PLACEHOLDER))
        {
            bail!(
                "`test.filter_args` must contain the {} placeholder.",
                FILTER_PLACEHOLDER
            );
        }

        if self.timeout_secs == Some(0) {
            bail!("`timeout_secs` must be greater than zero.");
        }
        if self.jobs == Some(0) {
            bail!("`jobs` must be greater than zero.");
        }
        Ok(())
    }

    fn ensure_declared(&self, version: &str, field: &str) -> Result<()> {
        if self.is_declared(version) {
            Ok(())
        } else {
            bail!(
                "{} refers to version '{}', which is not listed in `versions` ({}).",
                field,
                version,
                self.versions.join(", ")
            )
        }
    }

    /// Returns `true` if the version appears in `versions`.
    pub fn is_declared(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v == version)
    }

    /// The version used by the single-task `test` command: the explicit
    /// `default_version`, otherwise the newest (last) declared version.
    pub fn default_version(&self) -> &str {
        self.default_version
            .as_deref()
            .or_else(|| self.versions.last().map(String::as_str))
            .unwrap_or_default()
    }

    /// The full matrix in declaration order.
    pub fn full_matrix(&self) -> Vec<MatrixEntry> {
        if self.matrix.is_empty() {
            self.versions
                .iter()
                .map(|version| MatrixEntry {
                    version: version.clone(),
                    filter: String::new(),
                })
                .collect()
        } else {
            self.matrix.clone()
        }
    }

    /// The extras to install for a version: the base extras followed by every
    /// conditional set that lists the version, without duplicates.
    pub fn extras_for(&self, version: &str) -> Vec<String> {
        let conditional = self
            .environment
            .conditional_extras
            .iter()
            .filter(|c| c.versions.iter().any(|v| v == version))
            .flat_map(|c| c.extras.iter());

        let mut extras: Vec<String> = Vec::new();
        for extra in self.environment.extras.iter().chain(conditional) {
            if !extras.contains(extra) {
                extras.push(extra.clone());
            }
        }
        extras
    }

    /// Where per-task environments are created for the given project.
    pub fn resolve_env_root(&self, project_root: &Path) -> PathBuf {
        match &self.env_root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => project_root.join(root),
            None => std::env::temp_dir(),
        }
    }

    /// The per-task timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Parses and validates a matrix configuration from TOML text.
pub fn parse_matrix_config(content: &str) -> Result<MatrixConfig> {
    let config: MatrixConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Reads, parses and validates the matrix configuration file at `path`.
pub fn load_matrix_config(path: &Path) -> Result<MatrixConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_matrix_config(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}
