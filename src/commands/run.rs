//! # Run Command Module / 运行命令模块
//!
//! This module implements the matrix entry points of the CLI (`default`,
//! `check`, `test`, `testall` and the internal `_test`): it loads the matrix
//! configuration, runs the lint collaborators the invocation requires, then
//! dispatches the planned tasks and reports the aggregated outcome.
//!
//! 此模块实现 CLI 的矩阵入口（`default`、`check`、`test`、`testall` 和内部的 `_test`）：
//! 加载矩阵配置，运行调用所需的 lint 协作工具，然后分派计划中的任务并报告聚合结果。

use anyhow::{Context, Result};
use colored::*;
use std::{path::Path, path::PathBuf, sync::Arc};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::{self, LintSpec, MatrixConfig},
        execution::RunContext,
        matrix::{InvocationKind, LintMode, MatrixPlan},
        models::CollaboratorFailure,
        orchestrator::run_matrix,
    },
    infra::{
        command::{self, Placeholders, PreparedCommand},
        fs::absolute_path,
        t,
    },
    reporting::console::{print_failure_details, print_summary},
};

/// Options shared by every matrix entry point.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Path to the matrix configuration file.
    pub config: PathBuf,
    /// Directory the collaborators and tasks run in.
    pub project_dir: PathBuf,
    /// Overrides the configured concurrency cap.
    pub jobs: Option<usize>,
    /// The `--lang` value, if given.
    pub lang: Option<String>,
}

/// Executes one invocation kind end to end.
///
/// # Returns
/// `Ok(())` only if every collaborator and every task succeeded.
pub async fn execute(kind: InvocationKind, options: RunOptions) -> Result<()> {
    let (matrix_config, config_path) = setup_and_parse_config(&options.config)?;
    let selected_locale =
        select_locale(options.lang.as_deref(), matrix_config.language.as_deref());
    let locale = selected_locale.as_str();
    rust_i18n::set_locale(locale);

    let project_root = absolute_path(&options.project_dir).with_context(|| {
        t!(
            "project_dir_not_found",
            locale = locale,
            path = options.project_dir.display()
        )
        .to_string()
    })?;

    println!(
        "{}",
        t!("project_root_detected", locale = locale, path = project_root.display())
    );
    println!(
        "{}",
        t!("loading_matrix", locale = locale, path = config_path.display())
    );

    let plan = MatrixPlan::for_kind(&kind, &matrix_config)?;
    let jobs = options.jobs.or(matrix_config.jobs);

    let mode = if plan.parallel {
        t!("list.parallel", locale = locale)
    } else {
        t!("list.sequential", locale = locale)
    };
    println!(
        "{}",
        t!(
            "invocation_started",
            locale = locale,
            kind = kind.name(),
            count = plan.tasks.len(),
            mode = mode
        )
        .bold()
    );

    if let Some(lint_mode) = plan.lint {
        run_lint(&matrix_config.lint, lint_mode, &project_root, locale).await?;
    }

    let stop_token = setup_signal_handler(locale);
    let ctx = RunContext::new(matrix_config, project_root, locale).with_stop_token(stop_token);
    let outcome = run_matrix(&plan, Arc::new(ctx), jobs).await;

    print_summary(&outcome, locale);

    if outcome.is_success() {
        println!("\n{}", t!("all_tasks_passed", locale = locale).green().bold());
        Ok(())
    } else {
        print_failure_details(&outcome, locale);
        anyhow::bail!(
            "{}",
            t!(
                "matrix_failed",
                locale = locale,
                failed = outcome.failures().len(),
                total = outcome.results.len()
            )
        )
    }
}

/// Picks the UI language: `--lang` first, then the config's `language`,
/// then the system locale.
pub fn select_locale(flag: Option<&str>, configured: Option<&str>) -> String {
    match flag.or(configured) {
        Some(requested) => crate::resolve_locale(requested),
        None => crate::detect_locale(),
    }
}

/// Sets up and parses the matrix configuration file.
fn setup_and_parse_config(config_path_arg: &Path) -> Result<(MatrixConfig, PathBuf)> {
    // The configured locale is unknown until the file is parsed.
    let locale = rust_i18n::locale();
    let config_path = absolute_path(config_path_arg).with_context(|| {
        t!(
            "config_read_failed_path",
            locale = &*locale,
            path = config_path_arg.display()
        )
        .to_string()
    })?;

    let matrix_config = config::load_matrix_config(&config_path)
        .with_context(|| t!("config_parse_failed", locale = &*locale).to_string())?;

    Ok((matrix_config, config_path))
}

/// Runs the lint collaborators of `mode` in order, stopping at the first failure.
///
/// A failing collaborator is reported as a [`CollaboratorFailure`] inside the
/// returned error, so later steps of the invocation never start.
pub async fn run_lint(
    lint: &LintSpec,
    mode: LintMode,
    project_root: &Path,
    locale: &str,
) -> Result<()> {
    let commands = match mode {
        LintMode::Check => &lint.check,
        LintMode::Fix => &lint.fix,
    };
    if commands.is_empty() {
        println!("{}", t!("lint.none_configured", locale = locale).dimmed());
        return Ok(());
    }

    let placeholders =
        Placeholders::new().with("project_dir", project_root.to_string_lossy());

    for template in commands {
        let prepared = PreparedCommand::render(template, &placeholders)?;
        println!(
            "{} {}",
            t!("lint.running", locale = locale).blue(),
            prepared.display()
        );

        let status = command::run_inherited(&prepared, project_root).await?;
        if !status.success() {
            println!(
                "{}",
                t!("lint.failed", locale = locale, command = template).red()
            );
            return Err(anyhow::Error::new(CollaboratorFailure {
                command: template.clone(),
                exit_code: status.code(),
            }));
        }
    }

    println!("{}", t!("lint.passed", locale = locale).green());
    Ok(())
}

/// Sets up a signal handler for graceful shutdown.
fn setup_signal_handler(locale: &str) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            println!("\n{}", t!("shutdown_signal", locale = &locale).yellow());
            token_clone.cancel();
        }
    });

    token
}
