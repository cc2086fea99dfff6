//! # List Command Module / 列表命令模块
//!
//! Prints the tasks each invocation kind would run, without running anything.
//!
//! 打印每种调用类型将要运行的任务，但不执行任何操作。

use anyhow::{Context, Result};
use std::path::Path;

use crate::{
    core::{
        config,
        matrix::{InvocationKind, MatrixPlan},
    },
    infra::t,
    reporting::console::print_plan,
};

/// Loads the configuration and prints the plan of every user-facing entry point.
pub fn execute(config_path: &Path, locale: &str) -> Result<()> {
    let matrix_config = config::load_matrix_config(config_path)
        .with_context(|| t!("config_parse_failed", locale = locale).to_string())?;

    println!(
        "{}",
        t!("loading_matrix", locale = locale, path = config_path.display())
    );

    let kinds = [
        InvocationKind::Default,
        InvocationKind::Check,
        InvocationKind::Test {
            filter: String::new(),
        },
        InvocationKind::TestAll,
    ];
    for kind in &kinds {
        let plan = MatrixPlan::for_kind(kind, &matrix_config)?;
        println!();
        print_plan(kind, &plan, locale);
    }
    Ok(())
}
