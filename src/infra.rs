//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for envmatrix,
//! including command execution, environment directories, the output sink and i18n support.
//!
//! 此模块为 envmatrix 提供基础设施服务，
//! 包括命令执行、环境目录、输出接收器和国际化支持。

pub mod command;
pub mod fs;
pub mod output;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
