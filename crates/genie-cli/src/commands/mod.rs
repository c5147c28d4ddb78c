//! Subcommand implementations.

mod execute;
mod read;
mod wait;

use std::sync::Arc;

use anyhow::Context;
use genie_client::{GenieClient, GenieConfig};
use genie_core::{OutputStore, Table};
use genie_opendal::{StorageBackend, StorageConfig};
use serde_json::Value;

use crate::config::{Cli, Command, StoreKind};

/// How a command finished, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Everything requested was produced.
    Complete,
    /// Some outputs were still missing when the polling budget ran out.
    Incomplete,
}

impl Outcome {
    /// Returns the process exit code.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Complete => 0,
            Self::Incomplete => 2,
        }
    }
}

/// Runs the parsed command.
pub async fn dispatch(cli: Cli) -> anyhow::Result<Outcome> {
    let Cli {
        client,
        storage,
        command,
        ..
    } = cli;

    match command {
        Command::Execute(args) => execute::run(client, args).await,
        Command::Wait(args) => {
            let store = open_store(args.store, client, storage)?;
            wait::run(&*store, args).await
        }
        Command::Read(args) => {
            let store = open_store(args.store, client, storage)?;
            read::run(&*store, args).await
        }
    }
}

fn open_store(
    kind: StoreKind,
    client: GenieConfig,
    storage: StorageConfig,
) -> anyhow::Result<Arc<dyn OutputStore>> {
    let store: Arc<dyn OutputStore> = match kind {
        StoreKind::Api => {
            Arc::new(GenieClient::new(client).context("failed to create API client")?)
        }
        StoreKind::Storage => {
            Arc::new(StorageBackend::new(storage).context("failed to open output storage")?)
        }
    };

    Ok(store)
}

/// Formats output data for printing.
///
/// JSON is pretty-printed and anything else is printed as text. With `csv`,
/// JSON records and CSV data are both re-emitted as CSV.
pub(crate) fn render(data: &[u8], csv: bool) -> genie_core::Result<String> {
    let json = serde_json::from_slice::<Value>(data).ok();

    if csv {
        let table = match &json {
            Some(value) => Table::from_records(value)?,
            None => Table::from_csv(data)?,
        };
        return Ok(String::from_utf8_lossy(&table.to_csv()?).into_owned());
    }

    match json {
        Some(value) => Ok(serde_json::to_string_pretty(&value)?),
        None => Ok(String::from_utf8_lossy(data).into_owned()),
    }
}
