//! # envmatrix Library / envmatrix 库
//!
//! This library provides the core functionality for the `envmatrix` tool,
//! a configuration-driven orchestrator that runs a test command across a
//! matrix of runtime versions, each inside its own freshly provisioned environment.
//!
//! 此库为 `envmatrix` 工具提供核心功能，
//! 这是一个配置驱动的编排器，它在一组运行时版本上执行测试命令，每个版本都在全新的隔离环境中运行。
//!
//! ## Modules / 模块
//!
//! - `core` - Matrix definition, data models and the run orchestrator
//! - `infra` - Subprocess capture, environment directories and the output sink
//! - `reporting` - Console summaries
//! - `cli` / `commands` - Command-line interface and its subcommands
//!
//! - `core` - 矩阵定义、数据模型和运行编排器
//! - `infra` - 子进程输出捕获、环境目录和输出接收器
//! - `reporting` - 控制台摘要
//! - `cli` / `commands` - 命令行接口及其子命令

pub mod cli;
pub mod commands;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use crate::core::config;
pub use crate::core::execution;
pub use crate::core::matrix;
pub use crate::core::models;
pub use crate::core::orchestrator;

/// Detects the best available locale for the user interface.
///
/// It attempts to match the full system locale (e.g., "zh-CN"), then just the
/// language code (e.g., "en"), and finally falls back to "en".
pub fn detect_locale() -> String {
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    resolve_locale(&locale)
}

/// Maps a requested locale onto one of the bundled translations.
pub fn resolve_locale(requested: &str) -> String {
    let available_locales = rust_i18n::available_locales!();

    if available_locales.iter().any(|l| *l == requested) {
        return requested.to_string();
    }
    requested
        .split(['-', '_'])
        .next()
        .and_then(|lang_code| available_locales.iter().find(|l| **l == lang_code))
        .map(|l| l.to_string())
        .unwrap_or_else(|| "en".to_string())
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
