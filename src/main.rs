//! wifiqr command line.

use std::io::{self, IsTerminal};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use wifiqr::logging::{init_logging, LogConfig, LogFormat};

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg};
use crate::commands::{
    cancel_on_ctrl_c, run_batch_command, run_generate, run_settings, run_sources, AppContext,
};
use crate::summary::{print_batch_summary, print_generated, print_sources};

fn main() {
    let cli = Cli::parse();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let ctx = AppContext::load(cli.config.as_deref(), cli.output_dir.as_deref());
    let exit_code = match &cli.command {
        Command::Generate(args) => match run_generate(&ctx, args) {
            Ok(rendered) => {
                print_generated(&rendered);
                0
            }
            Err(error) => report(&error),
        },
        Command::Batch(args) => {
            let cancel = Arc::new(AtomicBool::new(false));
            cancel_on_ctrl_c(Arc::clone(&cancel));
            match run_batch_command(&ctx, args, &cancel) {
                Ok(result) => {
                    print_batch_summary(&result);
                    if result.report.failed() > 0 || result.report.cancelled {
                        1
                    } else {
                        0
                    }
                }
                Err(error) => report(&error),
            }
        }
        Command::Sources(args) => match run_sources(&ctx, args) {
            Ok(view) => {
                print_sources(&view);
                0
            }
            Err(error) => report(&error),
        },
        Command::Settings { action } => match run_settings(&ctx, action) {
            Ok(()) => 0,
            Err(error) => report(&error),
        },
    };
    std::process::exit(exit_code);
}

fn report(error: &anyhow::Error) -> i32 {
    eprintln!("error: {error:#}");
    1
}

fn log_config_from_cli(cli: &Cli) -> LogConfig {
    LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        use_env_filter: !cli.verbosity.is_present(),
        format: match cli.log_format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        },
        log_file: cli.log_file.clone(),
        log_data: cli.log_data,
        with_ansi: cli.log_file.is_none() && io::stderr().is_terminal(),
        ..LogConfig::default()
    }
}
