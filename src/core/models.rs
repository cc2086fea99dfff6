//! # Data Models Module / 数据模型模块
//!
//! This module defines the data structures shared by the orchestrator:
//! task lifecycle states, failure reasons, per-task execution results and
//! the aggregated outcome of a matrix run.
//!
//! 此模块定义编排器共享的数据结构：
//! 任务生命周期状态、失败原因、单任务执行结果以及矩阵运行的聚合结果。

use crate::core::matrix::Task;
use crate::infra::t;
use anyhow::{Result, bail};
use std::fmt;
use std::time::Duration;

/// Lifecycle of a single task.
/// `Pending → Provisioning → Running → {Succeeded | Failed}`, and
/// `Provisioning → Failed` when the environment cannot be built.
///
/// 单个任务的生命周期。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Provisioning,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    /// Returns `true` if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Pending, TaskState::Provisioning)
                | (TaskState::Provisioning, TaskState::Running)
                | (TaskState::Provisioning, TaskState::Failed)
                | (TaskState::Running, TaskState::Succeeded)
                | (TaskState::Running, TaskState::Failed)
        )
    }

    /// Moves to `next`, rejecting illegal transitions.
    pub fn advance(&mut self, next: TaskState) -> Result<()> {
        if !self.can_transition_to(next) {
            bail!("Illegal task state transition: {:?} -> {:?}", self, next);
        }
        *self = next;
        Ok(())
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

/// Enumerates the possible reasons for a task failure.
/// 枚举任务失败的可能原因。
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FailureReason {
    /// The environment could not be constructed for the task's version.
    /// 无法为任务的版本构建环境。
    Provisioning,
    /// The test command exited nonzero or could not be launched.
    /// 测试命令以非零状态退出或无法启动。
    Execution,
    /// The task exceeded the configured timeout.
    /// 任务超出了配置的超时时间。
    Timeout,
    /// The operator interrupted the run.
    /// 操作者中断了运行。
    Cancelled,
}

/// Terminal status of a task.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TaskStatus {
    Succeeded,
    Failed(FailureReason),
}

/// The result of running one task to completion.
/// 将一个任务运行至完成的结果。
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// The task this result belongs to.
    pub task: Task,
    pub status: TaskStatus,
    /// Exit code of the last subprocess that ran, when it exited normally.
    pub exit_code: Option<i32>,
    /// Every byte captured from the task's subprocesses, in order.
    pub output: Vec<u8>,
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Succeeded
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// The failure reason, if the task failed.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self.status {
            TaskStatus::Succeeded => None,
            TaskStatus::Failed(reason) => Some(reason),
        }
    }

    /// The captured output as text, with invalid UTF-8 replaced.
    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Gets the status of the result as a localized string for display.
    /// 以本地化字符串形式获取结果状态以供显示。
    pub fn get_status_str(&self, locale: &str) -> String {
        match self.status {
            TaskStatus::Succeeded => t!("report.status_passed", locale = locale).to_string(),
            TaskStatus::Failed(FailureReason::Provisioning) => {
                t!("report.status_provisioning_failed", locale = locale).to_string()
            }
            TaskStatus::Failed(FailureReason::Execution) => {
                t!("report.status_failed", locale = locale).to_string()
            }
            TaskStatus::Failed(FailureReason::Timeout) => {
                t!("report.status_timeout", locale = locale).to_string()
            }
            TaskStatus::Failed(FailureReason::Cancelled) => {
                t!("report.status_cancelled", locale = locale).to_string()
            }
        }
    }
}

/// The aggregated outcome of a matrix run.
/// 矩阵运行的聚合结果。
#[derive(Debug, Clone, Default)]
pub struct MatrixOutcome {
    /// One result per planned task, in declaration order.
    pub results: Vec<ExecutionResult>,
}

impl MatrixOutcome {
    /// Success only if every task succeeded.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(ExecutionResult::is_success)
    }

    pub fn failures(&self) -> Vec<&ExecutionResult> {
        self.results.iter().filter(|r| r.is_failure()).collect()
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }
}

/// A lint or format collaborator exited unsuccessfully.
/// Carried inside `anyhow::Error` so callers can downcast it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorFailure {
    /// The command line as configured.
    pub command: String,
    /// The exit code, if the process exited normally.
    pub exit_code: Option<i32>,
}

impl fmt::Display for CollaboratorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "Collaborator `{}` exited with code {}", self.command, code),
            None => write!(f, "Collaborator `{}` was terminated by a signal", self.command),
        }
    }
}

impl std::error::Error for CollaboratorFailure {}
