//! Reachability reports for output stores and the task API.
//!
//! A caller checks a store before dispatching a large batch of jobs that will
//! later be polled against it.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a health check.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ServiceStatus {
    #[default]
    Healthy,
    /// Reachable, but the answer was not the expected one.
    Degraded,
    /// Not reachable.
    Unhealthy,
}

/// A single health check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    /// Round trip of the check, when it was measured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub checked_at: Timestamp,
    /// Store-specific facts, such as the backend kind or object count.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, Value>,
}

impl ServiceHealth {
    fn new(status: ServiceStatus, detail: Option<String>) -> Self {
        Self {
            status,
            latency: None,
            detail,
            checked_at: Timestamp::now(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ServiceStatus::Healthy, None)
    }

    pub fn degraded(detail: impl Into<String>) -> Self {
        Self::new(ServiceStatus::Degraded, Some(detail.into()))
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self::new(ServiceStatus::Unhealthy, Some(detail.into()))
    }

    /// Healthy on `Ok`, unhealthy with the error text otherwise.
    pub fn from_check<E: fmt::Display>(result: std::result::Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::healthy(),
            Err(error) => Self::unhealthy(error.to_string()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_metric(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metrics.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ServiceHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        if let Some(latency) = self.latency {
            write!(f, " in {}ms", latency.as_millis())?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}
