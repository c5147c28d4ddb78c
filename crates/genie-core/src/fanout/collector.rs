//! Configurable fan-out collector.

use std::borrow::Cow;
use std::future::Future;
use std::num::NonZeroUsize;

use futures::future::{join_all, try_join_all};
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::time::Instant;

use super::{SettledBatch, TRACING_TARGET};

/// Dispatches batches of independent operations and joins on all of them.
///
/// By default every operation of a batch runs at once. With
/// [`with_max_concurrency`](Self::with_max_concurrency) at most `limit`
/// operations are in flight at a time; results still follow input order.
///
/// The collector holds no per-batch state, so one instance can be reused
/// for any number of batches.
#[derive(Debug, Clone, Default)]
pub struct Collector {
    name: Option<Cow<'static, str>>,
    max_concurrency: Option<NonZeroUsize>,
}

impl Collector {
    /// Creates an unbounded, unnamed collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the batch name recorded in tracing events.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Limits the number of operations in flight at once.
    ///
    /// A limit of zero removes the bound.
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = NonZeroUsize::new(limit);
        self
    }

    /// Returns the configured concurrency limit, if any.
    pub fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency.map(NonZeroUsize::get)
    }

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("anonymous")
    }

    /// Runs the batch and returns all values in input order, failing fast.
    ///
    /// The first error observed is returned unchanged. Operations that have
    /// not finished by then are dropped, which cancels their local futures
    /// (work already submitted to a remote service keeps running there).
    pub async fn collect<I, F, T, E>(&self, operations: I) -> Result<Vec<T>, E>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<T, E>>,
    {
        let operations: Vec<F> = operations.into_iter().collect();
        let size = operations.len();
        let started_at = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET,
            batch = self.name(),
            size,
            max_concurrency = ?self.max_concurrency(),
            "Dispatching batch"
        );

        let result = match self.max_concurrency {
            None => try_join_all(operations).await,
            Some(limit) => {
                stream::iter(operations)
                    .buffered(limit.get())
                    .try_collect()
                    .await
            }
        };

        let elapsed = started_at.elapsed();
        match &result {
            Ok(_) => tracing::debug!(
                target: TRACING_TARGET,
                batch = self.name(),
                size,
                elapsed_ms = elapsed.as_millis(),
                "Batch completed"
            ),
            Err(_) => tracing::warn!(
                target: TRACING_TARGET,
                batch = self.name(),
                size,
                elapsed_ms = elapsed.as_millis(),
                "Batch aborted on first failure"
            ),
        }

        result
    }

    /// Runs the batch to completion and returns every outcome in input order.
    pub async fn collect_settled<I, F, T, E>(&self, operations: I) -> SettledBatch<T, E>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<T, E>>,
    {
        let operations: Vec<F> = operations.into_iter().collect();
        let size = operations.len();
        let started_at = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET,
            batch = self.name(),
            size,
            max_concurrency = ?self.max_concurrency(),
            "Dispatching settled batch"
        );

        let results = match self.max_concurrency {
            None => join_all(operations).await,
            Some(limit) => {
                stream::iter(operations)
                    .buffered(limit.get())
                    .collect()
                    .await
            }
        };

        let batch = SettledBatch::from(results);

        tracing::debug!(
            target: TRACING_TARGET,
            batch = self.name(),
            size,
            succeeded = batch.succeeded(),
            failed = batch.failed(),
            elapsed_ms = started_at.elapsed().as_millis(),
            "Settled batch completed"
        );

        batch
    }
}
