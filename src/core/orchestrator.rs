//! # Run Orchestrator Module / 运行编排模块
//!
//! Dispatches every task of a [`MatrixPlan`] and combines their results.
//! Parallel plans launch independent tasks that share nothing but the output
//! sink; sequential plans run strictly in declaration order. A failing task
//! never cancels its siblings.
//!
//! 分派 [`MatrixPlan`] 中的每个任务并合并其结果。
//! 并行计划启动彼此独立的任务（仅共享输出接收器）；顺序计划严格按声明顺序运行。
//! 失败的任务永远不会取消其他任务。

use futures::{StreamExt, stream};
use std::sync::Arc;
use std::time::Duration;

use crate::core::{
    execution::{RunContext, run_task},
    matrix::{MatrixPlan, Task},
    models::{ExecutionResult, FailureReason, MatrixOutcome, TaskStatus},
};

/// Runs every task of the plan exactly once and returns one result per task,
/// in declaration order.
///
/// `jobs` caps how many tasks of a parallel plan run at the same time;
/// `None` runs them all at once.
pub async fn run_matrix(
    plan: &MatrixPlan,
    ctx: Arc<RunContext>,
    jobs: Option<usize>,
) -> MatrixOutcome {
    let results = if plan.parallel && plan.tasks.len() > 1 {
        let jobs = jobs.unwrap_or(plan.tasks.len()).max(1);
        run_parallel(&plan.tasks, ctx, jobs).await
    } else {
        run_sequential(&plan.tasks, &ctx).await
    };

    debug_assert_eq!(results.len(), plan.tasks.len());
    MatrixOutcome { results }
}

async fn run_sequential(tasks: &[Task], ctx: &RunContext) -> Vec<ExecutionResult> {
    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        results.push(run_task(task.clone(), ctx).await);
    }
    results
}

async fn run_parallel(tasks: &[Task], ctx: Arc<RunContext>, jobs: usize) -> Vec<ExecutionResult> {
    stream::iter(tasks.iter().cloned().map(|task| {
        let ctx = Arc::clone(&ctx);
        let task_for_error = task.clone();
        let handle = tokio::spawn(async move { run_task(task, &ctx).await });
        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => ExecutionResult {
                    task: task_for_error,
                    status: TaskStatus::Failed(FailureReason::Execution),
                    exit_code: None,
                    output: format!("Critical error during task execution: {}", e).into_bytes(),
                    duration: Duration::default(),
                },
            }
        }
    }))
    // `buffered` keeps declaration order while up to `jobs` tasks run at once.
    .buffered(jobs)
    .collect()
    .await
}
