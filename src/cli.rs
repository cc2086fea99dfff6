//! # Command-Line Interface / 命令行接口
//!
//! Builds the `envmatrix` command line with localized help texts and routes
//! each subcommand to its implementation.
//!
//! 构建带有本地化帮助文本的 `envmatrix` 命令行，并将每个子命令分派到其实现。

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf};

use crate::{
    commands::{self, run::RunOptions},
    core::matrix::InvocationKind,
    infra::t,
};

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` or `--lang=<VALUE>` argument.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--lang") {
        return args.get(pos + 1).cloned();
    }
    args.iter()
        .find_map(|arg| arg.strip_prefix("--lang=").map(str::to_string))
}

fn filter_arg(locale: &str) -> Arg {
    Arg::new("filter")
        .help(t!("arg_filter", locale = locale).to_string())
        .value_name("FILTER")
        .allow_hyphen_values(true)
        .action(ArgAction::Set)
}

/// Builds the full command definition.
pub fn build_cli(locale: &str) -> Command {
    Command::new("envmatrix")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli_about", locale = locale).to_string())
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help(t!("arg_config", locale = locale).to_string())
                .value_name("CONFIG")
                .default_value("Matrix.toml")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("project-dir")
                .long("project-dir")
                .help(t!("arg_project_dir", locale = locale).to_string())
                .value_name("PROJECT_DIR")
                .default_value(".")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .help(t!("arg_jobs", locale = locale).to_string())
                .value_name("JOBS")
                .value_parser(clap::value_parser!(usize))
                .global(true)
                .action(ArgAction::Set),
        )
        .subcommand(
            Command::new("default").about(t!("cmd_default_about", locale = locale).to_string()),
        )
        .subcommand(
            Command::new("check").about(t!("cmd_check_about", locale = locale).to_string()),
        )
        .subcommand(
            Command::new("test")
                .about(t!("cmd_test_about", locale = locale).to_string())
                .arg(filter_arg(locale)),
        )
        .subcommand(
            Command::new("testall").about(t!("cmd_testall_about", locale = locale).to_string()),
        )
        .subcommand(
            Command::new("_test")
                .hide(true)
                .arg(
                    Arg::new("version")
                        .value_name("VERSION")
                        .required(true)
                        .action(ArgAction::Set),
                )
                .arg(filter_arg(locale)),
        )
        .subcommand(
            Command::new("list").about(t!("cmd_list_about", locale = locale).to_string()),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cmd_init_about", locale = locale).to_string())
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("arg_non_interactive", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn filter_of(matches: &ArgMatches) -> String {
    matches.get_one::<String>("filter").cloned().unwrap_or_default()
}

/// Maps a parsed subcommand to its invocation kind. No subcommand means `default`.
pub fn invocation_kind(matches: &ArgMatches) -> Option<InvocationKind> {
    match matches.subcommand() {
        None | Some(("default", _)) => Some(InvocationKind::Default),
        Some(("check", _)) => Some(InvocationKind::Check),
        Some(("test", sub)) => Some(InvocationKind::Test {
            filter: filter_of(sub),
        }),
        Some(("testall", _)) => Some(InvocationKind::TestAll),
        Some(("_test", sub)) => Some(InvocationKind::Single {
            version: sub.get_one::<String>("version").cloned().unwrap_or_default(),
            filter: filter_of(sub),
        }),
        Some(_) => None,
    }
}

pub async fn run() -> Result<()> {
    // Pre-parse language and initialize i18n first.
    let lang_flag = pre_parse_language();
    let language = match &lang_flag {
        Some(lang) => crate::resolve_locale(lang),
        None => crate::detect_locale(),
    };
    rust_i18n::set_locale(&language);

    let matches = build_cli(&language).get_matches();

    let config = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("Matrix.toml"));
    let project_dir = matches
        .get_one::<PathBuf>("project-dir")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));

    match matches.subcommand() {
        Some(("list", _)) => commands::list::execute(&config, &language),
        Some(("init", init_matches)) => {
            let non_interactive = init_matches.get_flag("non-interactive");

            // Show language detection message if it was auto-detected
            if lang_flag.is_none() && !non_interactive {
                println!(
                    "🌐 {}",
                    t!("system_language_detected", locale = &language, lang = &language)
                );
            }
            commands::init::run_init_wizard(&config, &language, non_interactive)
        }
        _ => {
            let Some(kind) = invocation_kind(&matches) else {
                return Ok(());
            };
            let options = RunOptions {
                config,
                project_dir,
                jobs: matches.get_one::<usize>("jobs").copied(),
                lang: lang_flag,
            };
            commands::run::execute(kind, options).await
        }
    }
}
