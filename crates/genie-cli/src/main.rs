#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod commands;
mod config;
mod telemetry;

use std::process;

use crate::commands::Outcome;
use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "genie_cli::startup";
pub const TRACING_TARGET_COMMAND: &str = "genie_cli::command";

#[tokio::main]
async fn main() {
    let error = match run().await {
        Ok(outcome) => process::exit(outcome.exit_code()),
        Err(error) => error,
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_COMMAND,
            error = %error,
            "command failed"
        );
    }
    eprintln!("Error: {error:#}");

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<Outcome> {
    let cli = Cli::init();

    telemetry::init_tracing(cli.log_format)?;
    cli.log();

    commands::dispatch(cli).await
}
