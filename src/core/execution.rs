//! # Task Execution Module / 任务执行模块
//!
//! This module runs a single task through its whole lifecycle:
//! provisioning a fresh environment, running the test command inside it,
//! and emitting the captured output as one contiguous block.
//!
//! 此模块负责单个任务的完整生命周期：
//! 构建全新的环境、在其中运行测试命令，并将捕获的输出作为一个连续块输出。

use colored::*;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::MatrixConfig,
        matrix::Task,
        models::{ExecutionResult, FailureReason, TaskState, TaskStatus},
    },
    infra::{
        command::{self, CaptureBuffer, Placeholders, PreparedCommand},
        fs::Environment,
        output::OutputSink,
        t,
    },
    reporting::console::{BlockStep, render_task_block},
};

/// Everything a task needs besides the task itself. Shared read-only by all tasks.
///
/// 任务运行所需的除任务本身以外的一切。所有任务只读共享。
#[derive(Clone)]
pub struct RunContext {
    pub config: Arc<MatrixConfig>,
    /// Directory every subprocess runs in.
    pub project_root: PathBuf,
    /// Directory under which environments are created.
    pub env_root: PathBuf,
    pub locale: String,
    pub sink: OutputSink,
    /// Cancelled when the operator interrupts the run.
    pub stop: CancellationToken,
}

impl RunContext {
    pub fn new(config: MatrixConfig, project_root: PathBuf, locale: impl Into<String>) -> Self {
        let env_root = config.resolve_env_root(&project_root);
        Self {
            config: Arc::new(config),
            project_root,
            env_root,
            locale: locale.into(),
            sink: OutputSink::stdout(),
            stop: CancellationToken::new(),
        }
    }

    pub fn with_sink(mut self, sink: OutputSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_stop_token(mut self, stop: CancellationToken) -> Self {
        self.stop = stop;
        self
    }
}

/// One command run on behalf of a task, with its captured output.
struct Step {
    command: String,
    output: CaptureBuffer,
}

/// Mutable bookkeeping of a running task. It outlives the driving future so
/// that a timeout or cancellation still sees the phase and the output so far.
struct Progress<'a> {
    task: &'a Task,
    locale: &'a str,
    state: Mutex<TaskState>,
    steps: Mutex<Vec<Step>>,
}

impl<'a> Progress<'a> {
    fn new(task: &'a Task, locale: &'a str) -> Self {
        Self {
            task,
            locale,
            state: Mutex::new(TaskState::Pending),
            steps: Mutex::new(Vec::new()),
        }
    }

    fn enter(&self, next: TaskState) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = state.advance(next) {
            eprintln!("[{}] {}", self.task.label(), e);
            return;
        }

        let message = match next {
            TaskState::Provisioning => {
                t!("run.provisioning", locale = self.locale, label = self.task.label())
            }
            TaskState::Running => t!("run.running", locale = self.locale, label = self.task.label()),
            _ => return,
        };
        println!("{}", message.blue());
    }

    fn state(&self) -> TaskState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn start_step(&self, command: String) -> CaptureBuffer {
        let output = CaptureBuffer::default();
        self.steps
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(Step {
                command,
                output: Arc::clone(&output),
            });
        output
    }

    fn take_steps(&self) -> Vec<Step> {
        std::mem::take(&mut *self.steps.lock().unwrap_or_else(|p| p.into_inner()))
    }
}

/// How the driving future ended.
struct Finish {
    status: TaskStatus,
    exit_code: Option<i32>,
    error: Option<String>,
}

impl Finish {
    fn failed(reason: FailureReason, exit_code: Option<i32>, error: Option<String>) -> Self {
        Self {
            status: TaskStatus::Failed(reason),
            exit_code,
            error,
        }
    }
}

/// Runs one task to completion and returns its result.
///
/// Never returns an error: every way a task can end, including a failed
/// provisioning step, a timeout or an interrupt, is recorded in the result.
/// The task's output block is written to the context's sink before returning.
///
/// 将一个任务运行至完成并返回其结果。
/// 此函数从不返回错误：任务的任何结束方式（包括构建失败、超时或中断）都记录在结果中。
pub async fn run_task(task: Task, ctx: &RunContext) -> ExecutionResult {
    let start_time = Instant::now();
    let progress = Progress::new(&task, &ctx.locale);

    let guarded = async {
        match ctx.config.timeout() {
            Some(limit) => tokio::time::timeout(limit, drive(&task, ctx, &progress))
                .await
                .unwrap_or_else(|_| timed_out(limit, progress.state(), &ctx.locale)),
            None => drive(&task, ctx, &progress).await,
        }
    };

    let finish = tokio::select! {
        biased;
        _ = ctx.stop.cancelled() => Finish::failed(
            FailureReason::Cancelled,
            None,
            Some(t!("run.task_cancelled", locale = &ctx.locale).to_string()),
        ),
        finish = guarded => finish,
    };
    let duration = start_time.elapsed();

    let mut captured = Vec::new();
    for step in progress.take_steps() {
        let bytes = std::mem::take(&mut *step.output.lock().await);
        captured.push((step.command, bytes));
    }

    let result = ExecutionResult {
        task: task.clone(),
        status: finish.status,
        exit_code: finish.exit_code,
        output: captured.iter().flat_map(|(_, bytes)| bytes.iter().copied()).collect(),
        duration,
    };

    let steps: Vec<BlockStep<'_>> = captured
        .iter()
        .map(|(command, bytes)| BlockStep {
            command,
            output: bytes,
        })
        .collect();
    let block = render_task_block(&result, &steps, finish.error.as_deref(), &ctx.locale);
    if let Err(e) = ctx.sink.emit_block(&block) {
        eprintln!("Failed to write output of task '{}': {}", task.label(), e);
    }

    result
}

fn timed_out(limit: Duration, state: TaskState, locale: &str) -> Finish {
    let message = match state {
        TaskState::Provisioning => {
            t!("run.timeout_provisioning", locale = locale, secs = limit.as_secs())
        }
        _ => t!("run.timeout_running", locale = locale, secs = limit.as_secs()),
    };
    Finish::failed(FailureReason::Timeout, None, Some(message.to_string()))
}

/// Provisions the environment and runs the test command. The environment
/// directory lives exactly as long as this future.
async fn drive(task: &Task, ctx: &RunContext, progress: &Progress<'_>) -> Finish {
    let config = &ctx.config;
    progress.enter(TaskState::Provisioning);

    let environment = match Environment::create(&ctx.env_root, &task.slug()) {
        Ok(environment) => environment,
        Err(e) => {
            progress.enter(TaskState::Failed);
            return Finish::failed(FailureReason::Provisioning, None, Some(format!("{e:#}")));
        }
    };

    let env_dir = environment.path().to_string_lossy().into_owned();
    let placeholders = Placeholders::new()
        .with("version", task.version())
        .with("filter", task.filter())
        .with("label", task.label())
        .with("env_dir", env_dir.clone())
        .with("extras", config.extras_for(task.version()).join(","))
        .with("project_dir", ctx.project_root.to_string_lossy());
    let envs = vec![
        ("ENVMATRIX_VERSION".to_string(), task.version().to_string()),
        ("ENVMATRIX_ENV_DIR".to_string(), env_dir),
        ("ENVMATRIX_LABEL".to_string(), task.label().to_string()),
    ];

    for template in &config.environment.provision {
        let failure = match run_step(template, &placeholders, None, ctx, &envs, progress).await {
            Ok(Some(0)) => continue,
            Ok(exit_code) => Finish::failed(
                FailureReason::Provisioning,
                exit_code,
                Some(
                    t!("run.provision_step_failed", locale = &ctx.locale, command = template)
                        .to_string(),
                ),
            ),
            Err(e) => Finish::failed(FailureReason::Provisioning, None, Some(format!("{e:#}"))),
        };
        progress.enter(TaskState::Failed);
        return failure;
    }

    progress.enter(TaskState::Running);

    let filter_args = (!task.filter().is_empty()).then_some(config.test.filter_args.as_slice());
    let finish = match run_step(
        &config.test.command,
        &placeholders,
        filter_args,
        ctx,
        &envs,
        progress,
    )
    .await
    {
        Ok(Some(0)) => Finish {
            status: TaskStatus::Succeeded,
            exit_code: Some(0),
            error: None,
        },
        Ok(exit_code) => Finish::failed(FailureReason::Execution, exit_code, None),
        Err(e) => Finish::failed(FailureReason::Execution, None, Some(format!("{e:#}"))),
    };

    progress.enter(match finish.status {
        TaskStatus::Succeeded => TaskState::Succeeded,
        TaskStatus::Failed(_) => TaskState::Failed,
    });
    drop(environment);
    finish
}

/// Renders and runs one command, capturing its output into a new step.
/// Returns the exit code, or `None` if the process was killed by a signal.
async fn run_step(
    template: &str,
    placeholders: &Placeholders,
    extra_args: Option<&[String]>,
    ctx: &RunContext,
    envs: &[(String, String)],
    progress: &Progress<'_>,
) -> anyhow::Result<Option<i32>> {
    let mut prepared = PreparedCommand::render(template, placeholders)?;
    if let Some(extra) = extra_args {
        prepared.push_args(extra.iter().map(|arg| placeholders.substitute(arg)));
    }

    let buffer = progress.start_step(prepared.display());
    let cmd = prepared.to_command(&ctx.project_root, envs);
    let status = command::spawn_and_capture_into(cmd, buffer)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to execute '{}': {}", prepared.display(), e))?;
    Ok(status.code())
}
