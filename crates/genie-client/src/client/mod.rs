//! HTTP client for the task API.

mod helpers;
mod store;

use std::sync::Arc;

use bytes::Bytes;
use genie_core::fanout::{Collector, SettledBatch};
use genie_core::{Error, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde_json::Value;

use crate::request::ApiPayload;
use crate::{ApiError, Credentials, GenieConfig, TRACING_TARGET, TaskMode, TaskRequest, TaskResponse};

/// State shared by every client derived from the same configuration.
struct GenieClientInner {
    http: Client,
    config: GenieConfig,
    credentials: Credentials,
}

/// Client for the task API.
///
/// Cloning is cheap and clones share one connection pool. A client carries
/// its own [`TaskMode`]; [`with_task_mode`](Self::with_task_mode) derives a
/// client with another mode on the same pool.
///
/// # Examples
///
/// ```rust,ignore
/// use genie_client::{GenieClient, GenieConfig, TaskMode};
/// use genie_core::fanout::collect;
///
/// let client = GenieClient::new(GenieConfig::default())?;
/// let responses = collect(docs.iter().map(|doc| client.segment_text(doc, None))).await?;
///
/// let sync = client.with_task_mode(TaskMode::Sync);
/// let files = sync.list_doc_files("acme-2023-report", "**.csv").await?;
/// ```
#[derive(Clone)]
pub struct GenieClient {
    inner: Arc<GenieClientInner>,
    task_mode: TaskMode,
}

impl std::fmt::Debug for GenieClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenieClient")
            .field("api_url", &self.inner.config.api_url.as_str())
            .field("task_mode", &self.task_mode)
            .field("credentials", &self.inner.credentials)
            .finish_non_exhaustive()
    }
}

impl GenieClient {
    /// Creates a client, resolving credentials from the configuration and
    /// its secrets file.
    pub fn new(config: GenieConfig) -> Result<Self> {
        let credentials = Credentials::resolve(&config)?;
        Self::with_credentials(config, credentials)
    }

    /// Creates a client with explicit credentials.
    pub fn with_credentials(config: GenieConfig, credentials: Credentials) -> Result<Self> {
        let timeout = config.timeout();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(config.effective_user_agent())
            .default_headers(headers)
            .build()
            .map_err(|e| {
                Error::configuration()
                    .with_message("failed to build HTTP client")
                    .with_source(e)
            })?;

        if credentials.is_anonymous() {
            tracing::warn!(target: TRACING_TARGET, "No API key configured");
        }

        tracing::debug!(
            target: TRACING_TARGET,
            api_url = %config.api_url,
            timeout_ms = timeout.as_millis(),
            task_mode = %config.task_mode,
            "Created genie client"
        );

        let task_mode = config.task_mode;
        let inner = GenieClientInner {
            http,
            config,
            credentials,
        };

        Ok(Self {
            inner: Arc::new(inner),
            task_mode,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GenieConfig {
        &self.inner.config
    }

    /// Returns the credentials in use.
    pub fn credentials(&self) -> &Credentials {
        &self.inner.credentials
    }

    /// Returns the task mode sent with every task.
    pub fn task_mode(&self) -> TaskMode {
        self.task_mode
    }

    /// Returns a client with another task mode sharing this client's pool.
    #[must_use]
    pub fn with_task_mode(&self, task_mode: TaskMode) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            task_mode,
        }
    }

    /// Sends one task, retrying transient failures.
    pub async fn execute(&self, request: &TaskRequest) -> Result<TaskResponse> {
        let payload = ApiPayload::new(
            request,
            &self.inner.config,
            &self.inner.credentials,
            self.task_mode,
        );
        let body = Bytes::from(serde_json::to_vec(&payload)?);

        tracing::debug!(
            target: TRACING_TARGET,
            func = request.func(),
            task_mode = %self.task_mode,
            size = body.len(),
            "Executing task"
        );

        let response = self
            .inner
            .config
            .retry
            .retry(|| self.send(body.clone()))
            .await?;

        tracing::debug!(
            target: TRACING_TARGET,
            func = request.func(),
            status = response.status().unwrap_or("unknown"),
            scheduled = response.is_scheduled(),
            "Task executed"
        );

        Ok(response)
    }

    /// Sends every task concurrently and returns one outcome per task, in
    /// submission order.
    pub async fn execute_batch<I>(&self, requests: I) -> SettledBatch<TaskResponse, Error>
    where
        I: IntoIterator<Item = TaskRequest>,
    {
        let requests: Vec<TaskRequest> = requests.into_iter().collect();
        let collector = Collector::new()
            .with_name("execute_batch")
            .with_max_concurrency(self.inner.config.max_concurrency);

        collector
            .collect_settled(requests.iter().map(|request| self.execute(request)))
            .await
    }

    async fn send(&self, body: Bytes) -> Result<TaskResponse> {
        let response = self
            .inner
            .http
            .post(self.inner.config.api_url.clone())
            .body(body)
            .send()
            .await
            .map_err(ApiError::from)?;

        Ok(Self::handle_response(response).await?)
    }

    async fn handle_response(response: Response) -> std::result::Result<TaskResponse, ApiError> {
        let status = response.status();

        tracing::trace!(
            target: TRACING_TARGET,
            status = status.as_u16(),
            "Received API response"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::status(status, body));
        }

        let bytes = response.bytes().await?;
        let raw: Value = serde_json::from_slice(&bytes)?;
        Ok(TaskResponse::new(raw))
    }
}
