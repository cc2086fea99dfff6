//! # Console Reporting Module / 控制台报告模块
//!
//! This module renders per-task output blocks and prints colorful,
//! localized summaries of a matrix run to the console.
//!
//! 此模块渲染每个任务的输出块，并在控制台打印彩色的本地化矩阵运行摘要。

use colored::*;

use crate::core::matrix::{InvocationKind, LintMode, MatrixPlan};
use crate::core::models::{ExecutionResult, MatrixOutcome, TaskStatus};
use crate::infra::t;

/// One command of a task block: the rendered command line and its raw output.
pub struct BlockStep<'a> {
    pub command: &'a str,
    pub output: &'a [u8],
}

/// Renders the contiguous block shown for one finished task.
///
/// The captured bytes of each command are copied verbatim; a newline is only
/// added after them when the command's output did not end with one, so the
/// footer always starts on its own line.
///
/// 渲染单个已完成任务的连续输出块。每条命令捕获的字节被原样复制。
///
/// # Output Format / 输出格式
/// ```text
/// ==> [3.12 (not slow)]
/// $ .venv/bin/python -m pytest -m 'not slow'
/// ...captured output...
/// <== [3.12 (not slow)] Passed (1.23s)
/// ```
pub fn render_task_block(
    result: &ExecutionResult,
    steps: &[BlockStep<'_>],
    error: Option<&str>,
    locale: &str,
) -> Vec<u8> {
    let label = result.task.label();
    let mut block = Vec::new();

    block.extend_from_slice(format!("{} [{}]\n", "==>".bold(), label.cyan()).as_bytes());
    for step in steps {
        block.extend_from_slice(
            format!("{} {}\n", t!("run.command_prefix", locale = locale).blue(), step.command)
                .as_bytes(),
        );
        block.extend_from_slice(step.output);
        if !step.output.is_empty() && !step.output.ends_with(b"\n") {
            block.push(b'\n');
        }
    }
    if let Some(error) = error {
        block.extend_from_slice(format!("{}\n", error.red()).as_bytes());
    }

    let status = result.get_status_str(locale);
    let status = match result.status {
        TaskStatus::Succeeded => status.green(),
        TaskStatus::Failed(_) => status.red(),
    };
    block.extend_from_slice(
        format!(
            "{} [{}] {} ({:.2}s)\n",
            "<==".bold(),
            label.cyan(),
            status,
            result.duration.as_secs_f64()
        )
        .as_bytes(),
    );
    block
}

/// Prints a formatted summary of task results to the console.
///
/// 在控制台打印格式化的任务结果摘要。
///
/// # Output Format / 输出格式
/// ```text
/// --- Matrix Summary ---
///   - Passed             | 3.12                                     |      1.23s
///   - Failed             | 3.11 (not slow)                          |      0.45s  (exit code 1)
/// ```
pub fn print_summary(outcome: &MatrixOutcome, locale: &str) {
    println!("\n{}", t!("report.summary_banner", locale = locale).bold());

    for result in &outcome.results {
        let status_str = result.get_status_str(locale);
        let status_colored = if result.is_success() {
            status_str.green()
        } else {
            status_str.red()
        };
        let exit_str = match (result.is_failure(), result.exit_code) {
            (true, Some(code)) => format!(" {}", t!("report.exit_code", locale = locale, code = code)),
            _ => String::new(),
        };

        println!(
            "  - {:<20} | {:<40} | {:>10.2?}{}",
            status_colored,
            result.task.label(),
            result.duration,
            exit_str
        );
    }

    println!(
        "{}",
        t!(
            "report.totals",
            locale = locale,
            passed = outcome.passed_count(),
            total = outcome.results.len()
        )
    );
}

/// Lists the tasks that failed once more after the summary, so they are easy
/// to find above the fold.
///
/// 在摘要之后再次列出失败的任务，便于查找。
pub fn print_failure_details(outcome: &MatrixOutcome, locale: &str) {
    let failures = outcome.failures();
    if failures.is_empty() {
        return;
    }

    println!("\n{}", t!("report.failure_banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));
    for (i, result) in failures.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}': {}",
            i + 1,
            failures.len(),
            t!("report.header_failure", locale = locale).red(),
            result.task.label().cyan(),
            result.get_status_str(locale)
        );
    }
    println!("{}", "-".repeat(80));
}

/// Prints the tasks an invocation kind would run, without running anything.
///
/// 打印某个调用类型将要运行的任务，但不执行任何操作。
pub fn print_plan(kind: &InvocationKind, plan: &MatrixPlan, locale: &str) {
    let mode = if plan.parallel {
        t!("list.parallel", locale = locale)
    } else {
        t!("list.sequential", locale = locale)
    };
    let lint = match plan.lint {
        Some(LintMode::Check) => format!(" + {}", t!("list.lint_check", locale = locale)),
        Some(LintMode::Fix) => format!(" + {}", t!("list.lint_fix", locale = locale)),
        None => String::new(),
    };
    println!("{} ({}){}", kind.name().bold(), mode, lint);

    for task in &plan.tasks {
        if task.filter().is_empty() {
            println!("  - {}", task.version().cyan());
        } else {
            println!("  - {}  {}", task.version().cyan(), task.filter().dimmed());
        }
    }
}
