//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── client: GenieConfig     # API endpoint, credentials, task options, retry
//! ├── storage: StorageConfig  # Staged output storage (fs, memory, s3)
//! ├── log_format              # plain | json
//! └── command
//!     ├── execute             # Dispatch one task, optionally wait for it
//!     ├── wait                # Wait for a batch of outputs
//!     └── read                # Read one output
//! ```
//!
//! Every option can also be given through its `GENIE_*` environment variable.

use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use genie_client::GenieConfig;
use genie_core::poll::PollConfig;
use genie_opendal::StorageConfig;
use serde_json::{Map, Value};

use crate::telemetry::LogFormat;
use crate::{TRACING_TARGET_COMMAND, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Parser)]
#[command(name = "genie")]
#[command(about = "Dispatch document-processing jobs and collect their outputs")]
#[command(version)]
pub struct Cli {
    /// API client configuration.
    #[clap(flatten)]
    pub client: GenieConfig,

    /// Storage for staged outputs.
    #[clap(flatten)]
    pub storage: StorageConfig,

    /// Log line format
    #[arg(long, env = "GENIE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Dispatch one task and print the response
    Execute(ExecuteArgs),
    /// Wait for a batch of outputs and print the ready ones
    Wait(WaitArgs),
    /// Read and print one output
    Read(ReadArgs),
}

#[derive(Debug, Args)]
pub struct ExecuteArgs {
    /// Remote function name
    pub func: String,

    /// Function arguments as a JSON object
    #[arg(long, value_parser = parse_json_object, default_value = "{}")]
    pub args: Map<String, Value>,

    /// Run the task before answering instead of scheduling it
    #[arg(long)]
    pub sync: bool,

    /// Poll the output file of a scheduled task and print its data
    #[arg(long, conflicts_with = "sync")]
    pub wait: bool,

    #[clap(flatten)]
    pub poll: PollConfig,
}

#[derive(Debug, Args)]
pub struct WaitArgs {
    /// Output locations to wait for
    #[arg(required = true, num_args = 1..)]
    pub outputs: Vec<String>,

    /// Where the outputs are checked and read
    #[arg(long, value_enum, default_value_t = StoreKind::Api)]
    pub store: StoreKind,

    /// Print tabular outputs as CSV
    #[arg(long)]
    pub csv: bool,

    #[clap(flatten)]
    pub poll: PollConfig,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Output location
    pub output: String,

    /// Where the output is read from
    #[arg(long, value_enum, default_value_t = StoreKind::Api)]
    pub store: StoreKind,

    /// Print tabular output as CSV
    #[arg(long)]
    pub csv: bool,
}

/// Backing store for output checks and reads.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Remote storage through the task API.
    #[default]
    Api,
    /// The configured staging storage.
    Storage,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Logs configuration at debug level (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            features = ?enabled_features(),
            "Build information"
        );

        tracing::debug!(
            target: TRACING_TARGET_COMMAND,
            api_url = %self.client.api_url,
            task_mode = %self.client.task_mode,
            calc_mode = %self.client.calc_mode,
            retry_max_attempts = self.client.retry.max_attempts,
            storage_backend = %self.storage.backend,
            storage_root = %self.storage.root,
            "Configuration"
        );
    }
}

fn parse_json_object(raw: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {other}")),
        Err(err) => Err(format!("invalid JSON: {err}")),
    }
}

/// Returns a list of enabled compile-time features.
fn enabled_features() -> Vec<&'static str> {
    [
        cfg!(feature = "dotenv").then_some("dotenv"),
        cfg!(feature = "s3").then_some("s3"),
    ]
    .into_iter()
    .flatten()
    .collect()
}
