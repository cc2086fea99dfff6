//! # Core Module / 核心模块
//!
//! This module contains the core functionality of envmatrix: the matrix
//! configuration, task planning, data models and the run orchestrator.
//!
//! 此模块包含 envmatrix 的核心功能：
//! 矩阵配置、任务计划、数据模型和运行编排器。

pub mod config;
pub mod execution;
pub mod matrix;
pub mod models;
pub mod orchestrator;

// Re-exports
pub use config::MatrixConfig;
pub use execution::run_task;
pub use matrix::{InvocationKind, MatrixPlan, Task};
pub use models::ExecutionResult;
pub use orchestrator::run_matrix;
