//! `genie wait`: wait for a batch of outputs.

use genie_core::prelude::{OutputRef, OutputStore, PollPolicy, ReadyBatch, wait_for_batch};

use super::{Outcome, render};
use crate::TRACING_TARGET_COMMAND;
use crate::config::WaitArgs;

pub async fn run(store: &dyn OutputStore, args: WaitArgs) -> anyhow::Result<Outcome> {
    let policy = args.poll.policy();
    let batch = wait_outputs(store, &args.outputs, &policy, args.csv).await?;

    for (output, rendered) in &batch.ready {
        println!("# {output}");
        println!("{}", rendered.trim_end());
    }

    for output in &batch.missing {
        eprintln!("missing: {output}");
    }

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        ready = batch.ready.len(),
        missing = batch.missing.len(),
        "Wait finished"
    );

    Ok(if batch.is_complete() {
        Outcome::Complete
    } else {
        Outcome::Incomplete
    })
}

async fn wait_outputs(
    store: &dyn OutputStore,
    outputs: &[String],
    policy: &PollPolicy,
    csv: bool,
) -> genie_core::Result<ReadyBatch<String>> {
    let outputs = outputs.iter().map(OutputRef::from_legacy_path);
    wait_for_batch(store, outputs, policy, |_, data| render(&data, csv)).await
}
