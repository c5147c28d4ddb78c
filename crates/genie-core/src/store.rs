//! Storage seam for job outputs.

use std::sync::Arc;

use bytes::Bytes;

use crate::{OutputRef, Result, ServiceHealth};

/// Anything that can tell whether a job output exists and read it.
///
/// Implementations must treat a missing output as `Ok(false)` from
/// [`exists`](Self::exists), never as an error, and checking existence must
/// have no side effects so that it can be repeated freely while polling.
#[async_trait::async_trait]
pub trait OutputStore: Send + Sync {
    /// Returns whether the output exists.
    async fn exists(&self, output: &OutputRef) -> Result<bool>;

    /// Reads the full output.
    ///
    /// Returns an [`ErrorKind::NotFound`](crate::ErrorKind::NotFound) error if
    /// the output does not exist.
    async fn read(&self, output: &OutputRef) -> Result<Bytes>;

    /// Performs a health check on the store.
    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy())
    }
}

#[async_trait::async_trait]
impl<T> OutputStore for Arc<T>
where
    T: OutputStore + ?Sized,
{
    async fn exists(&self, output: &OutputRef) -> Result<bool> {
        self.as_ref().exists(output).await
    }

    async fn read(&self, output: &OutputRef) -> Result<Bytes> {
        self.as_ref().read(output).await
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        self.as_ref().health_check().await
    }
}
