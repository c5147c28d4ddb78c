//! Concurrent fan-out over a batch of independent operations.
//!
//! Every operation in a batch is created up front and driven concurrently on
//! the calling task; results come back aligned with the input order no matter
//! which operation finishes first. Two join policies are available:
//!
//! - [`collect`] is fail-fast: the first error is returned as-is and the
//!   operations still in flight are dropped.
//! - [`collect_settled`] never short-circuits and returns one `Result` per
//!   operation, so a batch can succeed partially.
//!
//! [`Collector`] exposes the same operations with a concurrency limit and a
//! batch name for tracing.
//!
//! # Example
//!
//! ```rust,ignore
//! use genie_core::fanout::{collect, collect_settled};
//!
//! let pages = collect(docs.iter().map(|doc| client.list_doc_files(doc, "**.csv"))).await?;
//!
//! let settled = collect_settled(docs.iter().map(|doc| client.segment_text(doc, None))).await;
//! let (ok, failed) = settled.partition();
//! ```

mod collector;
mod settled;

use std::future::Future;

pub use collector::Collector;
pub use settled::SettledBatch;

/// Tracing target for fan-out operations.
pub const TRACING_TARGET: &str = "genie_core::fanout";

/// Runs all operations concurrently and returns their values in input order.
///
/// Fails fast: if any operation returns an error, that error is returned and
/// every operation still in flight is dropped.
pub async fn collect<I, F, T, E>(operations: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    Collector::new().collect(operations).await
}

/// Runs all operations concurrently and returns every outcome in input order.
pub async fn collect_settled<I, F, T, E>(operations: I) -> SettledBatch<T, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    Collector::new().collect_settled(operations).await
}
