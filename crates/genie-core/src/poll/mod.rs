//! Poll-until-ready for outputs produced by out-of-band jobs.
//!
//! A remote job writes its result somewhere an [`OutputStore`] can see. The
//! functions here check for it without side effects, sleep between checks
//! according to a [`PollPolicy`], and give up once the policy's budget is
//! spent. An output that is not there yet is a value
//! ([`Readiness::NotReady`] or an entry in [`ReadyBatch::missing`]), never an
//! error; only store failures and parse failures are errors.

mod batch;
mod config;
mod policy;

use bytes::Bytes;
use tokio::time::Instant;

pub use batch::{ReadyBatch, gather_ready, wait_for_batch};
pub use config::PollConfig;
pub use policy::{MIN_DELAY, PollPolicy};

use crate::{Error, OutputRef, OutputStore, Result};

/// Tracing target for polling operations.
pub const TRACING_TARGET: &str = "genie_core::poll";

/// Outcome of a single readiness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness<T> {
    /// The output exists.
    Ready(T),
    /// The output does not exist yet.
    NotReady,
}

impl<T> Readiness<T> {
    /// Returns true if the output exists.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Maps the ready value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Readiness<U> {
        match self {
            Self::Ready(value) => Readiness::Ready(f(value)),
            Self::NotReady => Readiness::NotReady,
        }
    }

    /// Converts into an `Option`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::NotReady => None,
        }
    }
}

impl<T> From<Option<T>> for Readiness<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NotReady, Self::Ready)
    }
}

/// Checks once whether `output` exists and reads it if it does.
///
/// An output that disappears between the existence check and the read is
/// reported as not ready.
pub async fn check_once<S>(store: &S, output: &OutputRef) -> Result<Readiness<Bytes>>
where
    S: OutputStore + ?Sized,
{
    if !store.exists(output).await? {
        tracing::trace!(target: TRACING_TARGET, output = %output, "Output not ready");
        return Ok(Readiness::NotReady);
    }

    match store.read(output).await {
        Ok(data) => {
            tracing::trace!(
                target: TRACING_TARGET,
                output = %output,
                size = data.len(),
                "Output ready"
            );
            Ok(Readiness::Ready(data))
        }
        Err(error) if error.is_not_found() => Ok(Readiness::NotReady),
        Err(error) => Err(error),
    }
}

/// Re-checks `output` under `policy` until it exists, then returns its bytes.
///
/// Fails with [`ErrorKind::Timeout`](crate::ErrorKind::Timeout) once the
/// budget is spent. Store errors are returned immediately.
pub async fn poll_until_ready<S>(store: &S, output: &OutputRef, policy: &PollPolicy) -> Result<Bytes>
where
    S: OutputStore + ?Sized,
{
    let started_at = Instant::now();
    let deadline = policy.deadline(started_at);
    let mut attempt = 0u32;

    loop {
        if let Readiness::Ready(data) = check_once(store, output).await? {
            tracing::debug!(
                target: TRACING_TARGET,
                output = %output,
                attempts = attempt + 1,
                elapsed_ms = started_at.elapsed().as_millis(),
                "Output became ready"
            );
            return Ok(data);
        }

        let Some(delay) = policy.next_sleep(attempt, Instant::now(), deadline) else {
            tracing::warn!(
                target: TRACING_TARGET,
                output = %output,
                attempts = attempt + 1,
                timeout_ms = policy.timeout.as_millis(),
                "Gave up waiting for output"
            );
            return Err(Error::timeout().with_message(format!(
                "output {output} not ready after {}s",
                policy.timeout.as_secs()
            )));
        };

        tracing::debug!(
            target: TRACING_TARGET,
            output = %output,
            attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "Output not ready, waiting"
        );
        tokio::time::sleep(delay).await;
        attempt = attempt.saturating_add(1);
    }
}
