//! `genie execute`: dispatch one task.

use anyhow::{Context, bail};
use genie_client::{GenieClient, GenieConfig, TaskMode, TaskRequest};
use genie_core::poll::poll_until_ready;

use super::{Outcome, render};
use crate::TRACING_TARGET_COMMAND;
use crate::config::ExecuteArgs;

pub async fn run(config: GenieConfig, args: ExecuteArgs) -> anyhow::Result<Outcome> {
    let mut client = GenieClient::new(config).context("failed to create API client")?;
    if args.sync {
        client = client.with_task_mode(TaskMode::Sync);
    }

    let request = TaskRequest::new(args.func).with_args(args.args);
    let response = client
        .execute(&request)
        .await
        .with_context(|| format!("failed to execute {}", request.func()))?;

    if let Some(error) = response.error() {
        bail!("{} failed remotely: {error}", request.func());
    }

    if !args.wait || !response.is_scheduled() {
        println!("{}", serde_json::to_string_pretty(response.raw())?);
        return Ok(Outcome::Complete);
    }

    let Some(output) = response.output_file() else {
        bail!("{} was scheduled without an output file", request.func());
    };

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        func = request.func(),
        output = %output,
        "Waiting for output"
    );

    let policy = args.poll.policy();
    match poll_until_ready(&client, &output, &policy).await {
        Ok(data) => {
            println!("{}", render(&data, false)?);
            Ok(Outcome::Complete)
        }
        Err(error) if error.kind() == genie_core::ErrorKind::Timeout => {
            eprintln!("missing: {output}");
            Ok(Outcome::Incomplete)
        }
        Err(error) => Err(error).with_context(|| format!("failed to read {output}")),
    }
}
