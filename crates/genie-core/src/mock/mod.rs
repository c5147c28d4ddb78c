//! In-memory output store for testing.
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! genie-core = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use genie_core::mock::MemoryStore;
//!
//! let store = MemoryStore::new().with_object("jobs/1/out.csv", "a,b\n1,2\n");
//! store.insert_after("jobs/2/out.csv", "a,b\n3,4\n", Duration::from_secs(60));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use crate::{Error, ErrorKind, OutputRef, OutputStore, Result, ServiceHealth};

#[derive(Debug, Clone)]
enum Entry {
    Object { data: Bytes, visible_at: Instant },
    Failure(ErrorKind),
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    entries: Mutex<HashMap<String, Entry>>,
    exists_calls: AtomicUsize,
    read_calls: AtomicUsize,
}

/// Output store backed by a map, with delayed visibility and injected
/// failures.
///
/// Visibility follows the tokio clock, so outputs scheduled with
/// [`insert_after`](Self::insert_after) appear on time in tests that run
/// with paused time.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object that is visible immediately.
    #[must_use]
    pub fn with_object(self, location: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.insert(location, data);
        self
    }

    /// Makes every call for `location` fail with `kind`.
    #[must_use]
    pub fn with_failure(self, location: impl Into<String>, kind: ErrorKind) -> Self {
        self.entries().insert(location.into(), Entry::Failure(kind));
        self
    }

    /// Adds an object that is visible immediately.
    pub fn insert(&self, location: impl Into<String>, data: impl Into<Bytes>) {
        self.insert_after(location, data, Duration::ZERO);
    }

    /// Adds an object that becomes visible after `delay`.
    pub fn insert_after(&self, location: impl Into<String>, data: impl Into<Bytes>, delay: Duration) {
        let entry = Entry::Object {
            data: data.into(),
            visible_at: Instant::now() + delay,
        };
        self.entries().insert(location.into(), entry);
    }

    /// Removes an object or injected failure.
    pub fn remove(&self, location: &str) -> bool {
        self.entries().remove(location).is_some()
    }

    /// Returns how many times `exists` was called.
    pub fn exists_calls(&self) -> usize {
        self.inner.exists_calls.load(Ordering::SeqCst)
    }

    /// Returns how many times `read` was called.
    pub fn read_calls(&self) -> usize {
        self.inner.read_calls.load(Ordering::SeqCst)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lookup(&self, output: &OutputRef) -> Result<Option<Bytes>> {
        match self.entries().get(output.location()) {
            Some(Entry::Failure(kind)) => Err(Error::new(*kind)
                .with_message(format!("injected failure for {output}"))),
            Some(Entry::Object { data, visible_at }) if Instant::now() >= *visible_at => {
                Ok(Some(data.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl OutputStore for MemoryStore {
    async fn exists(&self, output: &OutputRef) -> Result<bool> {
        self.inner.exists_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.lookup(output)?.is_some())
    }

    async fn read(&self, output: &OutputRef) -> Result<Bytes> {
        self.inner.read_calls.fetch_add(1, Ordering::SeqCst);
        self.lookup(output)?
            .ok_or_else(|| Error::not_found().with_message(format!("no output at {output}")))
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy().with_metric("objects", self.entries().len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let store = MemoryStore::new();
        let error = store.read(&OutputRef::new("missing")).await.unwrap_err();
        assert!(error.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_visibility() {
        let store = MemoryStore::new();
        store.insert_after("later", "x", Duration::from_secs(5));
        let output = OutputRef::new("later");

        assert!(!store.exists(&output).await.unwrap());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(store.exists(&output).await.unwrap());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let clone = store.clone();
        clone.insert("a", "1");

        assert!(store.exists(&OutputRef::new("a")).await.unwrap());
        assert!(store.remove("a"));
        assert!(!clone.exists(&OutputRef::new("a")).await.unwrap());
        assert_eq!(clone.exists_calls(), 2);
    }
}
