//! # Matrix Planning Module / 矩阵计划模块
//!
//! This module turns the static matrix configuration into the ordered list of
//! tasks run by one invocation. Selection is an explicit table keyed by
//! [`InvocationKind`]; nothing is inferred from the machine's state.
//!
//! 此模块将静态矩阵配置转换为一次调用要运行的有序任务列表。
//! 选择逻辑是一个以 [`InvocationKind`] 为键的显式表，不从机器状态推断任何内容。

use anyhow::{Result, bail};
use std::fmt;

use crate::core::config::MatrixConfig;

/// One (version, filter) unit of test execution. Immutable once built.
/// 一个 (版本, 过滤器) 测试执行单元。构建后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Task {
    version: String,
    filter: String,
    label: String,
}

impl Task {
    pub fn new(version: impl Into<String>, filter: impl Into<String>) -> Self {
        let version = version.into();
        let filter = filter.into();
        let label = if filter.is_empty() {
            version.clone()
        } else {
            format!("{} ({})", version, filter)
        };
        Self {
            version,
            filter,
            label,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The opaque selection expression. Empty means the full suite.
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Identifier used in log lines and summaries.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// A filesystem-safe form of the label, used to name environment directories.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.label.len());
        for c in self.label.chars() {
            if c.is_ascii_alphanumeric() || c == '.' {
                slug.push(c);
            } else if !slug.ends_with('_') {
                slug.push('_');
            }
        }
        slug.trim_matches('_').to_string()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// The named entry points an operator can invoke.
/// 操作者可以调用的命名入口。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationKind {
    /// Lint-fix collaborators, then the full matrix.
    Default,
    /// Lint-check collaborators, then the full matrix.
    Check,
    /// A single task against the default version.
    Test { filter: String },
    /// The full matrix, in parallel.
    TestAll,
    /// A single task for an explicit version (the internal `_test` entry point).
    Single { version: String, filter: String },
}

impl InvocationKind {
    /// The command-line name of the entry point.
    pub fn name(&self) -> &'static str {
        match self {
            InvocationKind::Default => "default",
            InvocationKind::Check => "check",
            InvocationKind::Test { .. } => "test",
            InvocationKind::TestAll => "testall",
            InvocationKind::Single { .. } => "_test",
        }
    }
}

/// Which set of lint collaborators runs before the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintMode {
    /// Report problems without touching files.
    Check,
    /// Rewrite files in place.
    Fix,
}

/// Everything one invocation will do, fixed before anything runs.
/// 一次调用将要执行的全部内容，在任何操作开始前确定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixPlan {
    /// Tasks in declaration order.
    pub tasks: Vec<Task>,
    /// Whether tasks are dispatched concurrently.
    pub parallel: bool,
    /// The collaborator step that must succeed before any task is dispatched.
    pub lint: Option<LintMode>,
}

impl MatrixPlan {
    /// Builds the plan for an invocation kind from the static configuration.
    pub fn for_kind(kind: &InvocationKind, config: &MatrixConfig) -> Result<Self> {
        let plan = match kind {
            InvocationKind::Default => Self::full(config, Some(LintMode::Fix)),
            InvocationKind::Check => Self::full(config, Some(LintMode::Check)),
            InvocationKind::TestAll => Self::full(config, None),
            InvocationKind::Test { filter } => Self::single(config.default_version(), filter),
            InvocationKind::Single { version, filter } => {
                if !config.is_declared(version) {
                    bail!(
                        "Unknown version '{}'. Declared versions: {}",
                        version,
                        config.versions.join(", ")
                    );
                }
                Self::single(version, filter)
            }
        };
        Ok(plan)
    }

    fn full(config: &MatrixConfig, lint: Option<LintMode>) -> Self {
        Self {
            tasks: config
                .full_matrix()
                .into_iter()
                .map(|entry| Task::new(entry.version, entry.filter))
                .collect(),
            parallel: true,
            lint,
        }
    }

    fn single(version: &str, filter: &str) -> Self {
        Self {
            tasks: vec![Task::new(version, filter)],
            parallel: false,
            lint: None,
        }
    }
}
