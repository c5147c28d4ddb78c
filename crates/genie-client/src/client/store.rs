//! Remote storage seen through the task API.

use std::time::Instant;

use bytes::Bytes;
use genie_core::{Error, OutputRef, OutputStore, Result, ServiceHealth};
use serde_json::Value;

use super::GenieClient;
use crate::{TRACING_TARGET, TaskMode};

impl GenieClient {
    fn sync_client(&self) -> GenieClient {
        match self.task_mode {
            TaskMode::Sync => self.clone(),
            TaskMode::Async => self.with_task_mode(TaskMode::Sync),
        }
    }
}

/// Existence and reads go through `check_file_exists` and `read_file`,
/// always in sync mode so that the answer is in the response.
#[async_trait::async_trait]
impl OutputStore for GenieClient {
    async fn exists(&self, output: &OutputRef) -> Result<bool> {
        let response = self.sync_client().check_file_exists(output.location()).await?;

        let exists = match response.data() {
            Some(Value::Bool(exists)) => *exists,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            None => false,
            Some(other) => {
                return Err(Error::external_error()
                    .with_message(format!("unexpected check_file_exists answer: {other}")));
            }
        };

        tracing::trace!(target: TRACING_TARGET, output = %output, exists, "Checked output");
        Ok(exists)
    }

    /// Existence is decided by [`exists`](Self::exists) alone: a file whose
    /// content comes back empty reads as JSON `null`.
    async fn read(&self, output: &OutputRef) -> Result<Bytes> {
        let response = self.sync_client().read_file(output.location()).await?;

        match response.data() {
            Some(data) => Ok(Bytes::from(serde_json::to_vec(data)?)),
            None => {
                tracing::debug!(target: TRACING_TARGET, output = %output, "Output has no content");
                Ok(Bytes::from_static(b"null"))
            }
        }
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        let started_at = Instant::now();

        let health = match self.sync_client().slugify("health check").await {
            Ok(response) if response.error().is_none() => ServiceHealth::healthy(),
            Ok(response) => ServiceHealth::degraded(response.error().unwrap_or_default()),
            Err(error) => ServiceHealth::unhealthy(error.to_string()),
        };

        Ok(health.with_latency(started_at.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use genie_core::ServiceStatus;
    use genie_core::poll::{PollPolicy, gather_ready, poll_until_ready, wait_for_batch};
    use serde_json::json;

    use super::*;
    use crate::testing::{FakeApi, output_file_for};

    #[tokio::test]
    async fn test_exists_and_read() {
        let api = FakeApi::start().await;
        api.put_file("gs://db-genie/a.csv", json!([{"text": "Revenue"}]));
        let client = api.client(TaskMode::Async);

        assert!(client.exists(&OutputRef::new("gs://db-genie/a.csv")).await.unwrap());
        assert!(!client.exists(&OutputRef::new("gs://db-genie/b.csv")).await.unwrap());

        let data = client.read(&OutputRef::new("gs://db-genie/a.csv")).await.unwrap();
        let value: Value = serde_json::from_slice(&data).unwrap();
        assert_eq!(value, json!([{"text": "Revenue"}]));

        // Store calls are made in sync mode even from an async client.
        assert!(api
            .payloads()
            .iter()
            .all(|p| p["tasks"]["task_1"]["task_mode"] == "sync"));
    }

    #[tokio::test]
    async fn test_read_empty_file_is_null() {
        let api = FakeApi::start().await;
        let client = api.client(TaskMode::Sync);

        let data = client.read(&OutputRef::new("gs://db-genie/none")).await.unwrap();
        assert_eq!(data, Bytes::from_static(b"null"));
    }

    #[tokio::test]
    async fn test_existing_empty_output_is_ready() {
        let api = FakeApi::start().await;
        let client = api.client(TaskMode::Async);
        api.put_file("gs://db-genie/empty.csv", Value::Null);

        let outputs = [OutputRef::new("gs://db-genie/empty.csv")];
        let batch = gather_ready(&client, outputs, |_, data| {
            Ok(serde_json::from_slice::<Value>(&data)?)
        })
        .await
        .unwrap();

        assert!(batch.missing.is_empty());
        assert_eq!(batch.ready.len(), 1);
        assert_eq!(batch.ready[0].1, Value::Null);
    }

    #[tokio::test]
    async fn test_scheduled_job_then_poll() {
        let api = FakeApi::start().await;
        let client = api.client(TaskMode::Async);

        let response = client.segment_text("acme", None).await.unwrap();
        let output = response.output_file().unwrap();
        assert_eq!(output.location(), output_file_for("acme", "segment_text"));

        api.put_file(output.location(), json!([{"segment": "Scope 1"}]));

        let policy = PollPolicy::fixed(Duration::from_millis(10), Duration::from_secs(5));
        let data = poll_until_ready(&client, &output, &policy).await.unwrap();
        let value: Value = serde_json::from_slice(&data).unwrap();
        assert_eq!(value, json!([{"segment": "Scope 1"}]));
    }

    #[tokio::test]
    async fn test_wait_for_batch_reports_missing() {
        let api = FakeApi::start().await;
        let client = api.client(TaskMode::Async);
        api.put_file(&output_file_for("a", "segment_text"), json!([]));

        let outputs = ["a", "b"]
            .iter()
            .map(|doc| OutputRef::from_legacy_path(output_file_for(doc, "segment_text")));
        let policy = PollPolicy::fixed(Duration::from_millis(10), Duration::from_millis(50));

        let batch = wait_for_batch(&client, outputs, &policy, |_, data| {
            Ok(serde_json::from_slice::<Value>(&data)?)
        })
        .await
        .unwrap();

        assert_eq!(batch.ready.len(), 1);
        assert_eq!(batch.missing.len(), 1);
        assert_eq!(batch.missing[0].meta("entity"), Some("b"));
    }

    #[tokio::test]
    async fn test_health_check() {
        let api = FakeApi::start().await;
        let client = api.client(TaskMode::Async);

        let health = client.health_check().await.unwrap();
        assert_eq!(health.status, ServiceStatus::Healthy);
        assert!(health.latency.is_some());
    }
}
