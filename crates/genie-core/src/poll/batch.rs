//! Readiness of a batch of outputs.

use bytes::Bytes;
use tokio::time::Instant;

use super::{PollPolicy, Readiness, TRACING_TARGET, check_once};
use crate::fanout::collect;
use crate::{OutputRef, OutputStore, Result};

/// Partition of a batch of outputs into the ready ones and the missing ones.
///
/// Both lists follow the order of the input batch, every input lands in
/// exactly one of them.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyBatch<T> {
    /// Outputs that exist, with their parsed contents.
    pub ready: Vec<(OutputRef, T)>,
    /// Outputs that do not exist yet.
    pub missing: Vec<OutputRef>,
}

impl<T> ReadyBatch<T> {
    /// Returns the number of outputs in the batch.
    pub fn len(&self) -> usize {
        self.ready.len() + self.missing.len()
    }

    /// Returns true if the batch had no outputs.
    pub fn is_empty(&self) -> bool {
        self.ready.is_empty() && self.missing.is_empty()
    }

    /// Returns true if every output is ready.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Returns the parsed contents of the ready outputs.
    pub fn into_values(self) -> Vec<T> {
        self.ready.into_iter().map(|(_, value)| value).collect()
    }
}

impl<T> Default for ReadyBatch<T> {
    fn default() -> Self {
        Self {
            ready: Vec::new(),
            missing: Vec::new(),
        }
    }
}

/// Checks every output once, concurrently, and parses the ones that exist.
///
/// Store errors and parse errors fail the whole call.
pub async fn gather_ready<S, I, F, T>(store: &S, outputs: I, parse: F) -> Result<ReadyBatch<T>>
where
    S: OutputStore + ?Sized,
    I: IntoIterator<Item = OutputRef>,
    F: Fn(&OutputRef, Bytes) -> Result<T>,
{
    let pending: Vec<(usize, OutputRef)> = outputs.into_iter().enumerate().collect();
    let (ready, missing) = check_pending(store, pending, &parse).await?;

    Ok(ReadyBatch {
        ready: ready.into_iter().map(|(_, output, value)| (output, value)).collect(),
        missing: missing.into_iter().map(|(_, output)| output).collect(),
    })
}

/// Re-checks the missing part of a batch under `policy` until every output
/// is ready or the budget is spent.
///
/// Running out of budget is not an error: the outputs still absent are
/// returned in [`ReadyBatch::missing`].
pub async fn wait_for_batch<S, I, F, T>(
    store: &S,
    outputs: I,
    policy: &PollPolicy,
    parse: F,
) -> Result<ReadyBatch<T>>
where
    S: OutputStore + ?Sized,
    I: IntoIterator<Item = OutputRef>,
    F: Fn(&OutputRef, Bytes) -> Result<T>,
{
    let started_at = Instant::now();
    let deadline = policy.deadline(started_at);

    let mut pending: Vec<(usize, OutputRef)> = outputs.into_iter().enumerate().collect();
    let size = pending.len();
    let mut ready = Vec::with_capacity(size);
    let mut attempt = 0u32;

    loop {
        let (found, missing) = check_pending(store, pending, &parse).await?;
        ready.extend(found);
        pending = missing;

        tracing::debug!(
            target: TRACING_TARGET,
            size,
            ready = ready.len(),
            missing = pending.len(),
            attempt = attempt + 1,
            "Checked batch"
        );

        if pending.is_empty() {
            break;
        }
        let Some(delay) = policy.next_sleep(attempt, Instant::now(), deadline) else {
            break;
        };

        tokio::time::sleep(delay).await;
        attempt = attempt.saturating_add(1);
    }

    if !pending.is_empty() {
        tracing::warn!(
            target: TRACING_TARGET,
            size,
            missing = pending.len(),
            elapsed_ms = started_at.elapsed().as_millis(),
            "Batch partially ready at end of budget"
        );
    }

    ready.sort_by_key(|(index, ..)| *index);

    Ok(ReadyBatch {
        ready: ready.into_iter().map(|(_, output, value)| (output, value)).collect(),
        missing: pending.into_iter().map(|(_, output)| output).collect(),
    })
}

type Checked<T> = (Vec<(usize, OutputRef, T)>, Vec<(usize, OutputRef)>);

async fn check_pending<S, F, T>(
    store: &S,
    pending: Vec<(usize, OutputRef)>,
    parse: &F,
) -> Result<Checked<T>>
where
    S: OutputStore + ?Sized,
    F: Fn(&OutputRef, Bytes) -> Result<T>,
{
    let checks = pending.iter().map(|(_, output)| check_once(store, output));
    let readiness = collect(checks).await?;

    let mut ready = Vec::new();
    let mut missing = Vec::new();
    for ((index, output), readiness) in pending.into_iter().zip(readiness) {
        match readiness {
            Readiness::Ready(data) => {
                let value = parse(&output, data)?;
                ready.push((index, output, value));
            }
            Readiness::NotReady => missing.push((index, output)),
        }
    }

    Ok((ready, missing))
}
