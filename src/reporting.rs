//! # Reporting Module / 报告模块
//!
//! This module handles the display of task output and run summaries.
//! It prints colorful, formatted console output with internationalization support.
//!
//! 此模块处理任务输出和运行摘要的显示。
//! 它在控制台打印彩色格式化输出，支持国际化。

pub mod console;

// Re-export common reporting functions
pub use console::{print_failure_details, print_plan, print_summary, render_task_block};
