// Main CLI entrypoint
// (c) 2024 Ross Younger

use std::process::ExitCode;

use anstream::{eprintln, println};

use super::args::CliArgs;
use super::styles::WARNING;

use crate::{
    config::{Configuration, Manager},
    util::setup_tracing,
};
use anyhow::Context as _;
use clap::{CommandFactory as _, Parser as _};

/// Main CLI entrypoint
pub fn cli() -> anyhow::Result<ExitCode> {
    let args = CliArgs::parse();
    if args.config_files {
        for file in Manager::config_files() {
            println!("{}", file.display());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let trace_level = if args.debug {
        "trace"
    } else if args.quiet {
        "error"
    } else {
        "info"
    };
    setup_tracing(trace_level, args.log_file.as_deref()).inspect_err(|e| eprintln!("{e:?}"))?;

    let mut manager = Manager::new();
    if let Some(file) = &args.config_file {
        manager = manager.with_file(file);
    }
    let manager = manager.with_cli(args.config.clone());

    if args.show_config {
        for (field, source) in manager.unrecognised() {
            eprintln!("{WARNING}WARNING{WARNING:#}: unrecognised field `{field}` in {source}");
        }
        println!("{}", manager.table());
        return Ok(ExitCode::SUCCESS);
    }
    let config = manager.get().context("failed to parse configuration")?;

    let Some(command) = args.command else {
        CliArgs::command().print_help()?;
        return Ok(ExitCode::FAILURE);
    };
    run_command(command, &config)
}

#[tokio::main(flavor = "current_thread")]
async fn run_command(command: super::args::Command, config: &Configuration) -> anyhow::Result<ExitCode> {
    super::commands::dispatch(command, config)
        .await
        .inspect_err(|e| tracing::error!("{e:#}"))
        .or_else(|_| Ok(false))
        .map(|success| {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        })
}
