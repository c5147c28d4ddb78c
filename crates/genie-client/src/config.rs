//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::{ArgAction, Args, ValueEnum};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use url::Url;

use crate::RetryConfig;

/// Default API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.byte-genie.com/execute";

/// Default HTTP timeout: 15 minutes.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15 * 60;

/// Default secrets file, relative to the working directory.
pub const DEFAULT_SECRETS_FILE: &str = "secrets.json";

/// Whether the API runs a task before answering or schedules it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskMode {
    /// The response carries the task output.
    Sync,
    /// The response acknowledges the task; the output appears later.
    #[default]
    Async,
}

/// How the remote side spreads work within a task.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CalcMode {
    /// Sequential processing.
    Sync,
    /// Concurrent processing.
    #[default]
    Async,
    /// Parallel processing across workers.
    Parallel,
}

/// Configuration for [`GenieClient`](crate::GenieClient).
///
/// Credentials given here take precedence over the secrets file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct GenieConfig {
    /// API endpoint that accepts task payloads
    #[cfg_attr(
        feature = "config",
        arg(long = "api-url", env = "GENIE_API_URL", default_value = DEFAULT_API_URL)
    )]
    #[serde(default = "default_api_url")]
    pub api_url: Url,

    /// API key, overrides the secrets file
    #[cfg_attr(feature = "config", arg(long = "api-key", env = "GENIE_API_KEY"))]
    #[serde(default)]
    pub api_key: Option<String>,

    /// Username for uploads, overrides the secrets file
    #[cfg_attr(feature = "config", arg(long = "username", env = "GENIE_USERNAME"))]
    #[serde(default)]
    pub username: Option<String>,

    /// JSON file with BYTE_GENIE_KEY and USERNAME entries
    #[cfg_attr(
        feature = "config",
        arg(long = "secrets-file", env = "GENIE_SECRETS_FILE", default_value = DEFAULT_SECRETS_FILE)
    )]
    #[serde(default = "default_secrets_file")]
    pub secrets_file: PathBuf,

    /// Task mode sent with every task
    #[cfg_attr(
        feature = "config",
        arg(long = "task-mode", env = "GENIE_TASK_MODE", value_enum, default_value_t = TaskMode::Async)
    )]
    #[serde(default)]
    pub task_mode: TaskMode,

    /// Calculation mode sent with every task
    #[cfg_attr(
        feature = "config",
        arg(long = "calc-mode", env = "GENIE_CALC_MODE", value_enum, default_value_t = CalcMode::Async)
    )]
    #[serde(default)]
    pub calc_mode: CalcMode,

    /// Ask the API to return output data rather than only the output file
    #[cfg_attr(
        feature = "config",
        arg(long = "return-data", env = "GENIE_RETURN_DATA", action = ArgAction::Set, default_value_t = true)
    )]
    #[serde(default = "default_true")]
    pub return_data: bool,

    /// Overwrite the task output if it already exists
    #[cfg_attr(feature = "config", arg(long = "overwrite", env = "GENIE_OVERWRITE"))]
    #[serde(default)]
    pub overwrite: bool,

    /// Overwrite the outputs of upstream tasks if they already exist
    #[cfg_attr(
        feature = "config",
        arg(long = "overwrite-base-output", env = "GENIE_OVERWRITE_BASE_OUTPUT")
    )]
    #[serde(default)]
    pub overwrite_base_output: bool,

    /// Ask the API to log task progress
    #[cfg_attr(
        feature = "config",
        arg(long = "verbose", env = "GENIE_VERBOSE", action = ArgAction::Set, default_value_t = true)
    )]
    #[serde(default = "default_true")]
    pub verbose: bool,

    /// HTTP request timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "http-timeout", env = "GENIE_HTTP_TIMEOUT", default_value = "900")
    )]
    #[serde(default = "default_timeout_secs")]
    pub http_timeout: u64,

    /// User-Agent header to send with requests
    #[cfg_attr(feature = "config", arg(long = "http-user-agent", env = "GENIE_HTTP_USER_AGENT"))]
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Maximum number of tasks in flight per batch (0 for unbounded)
    #[cfg_attr(
        feature = "config",
        arg(long = "max-concurrency", env = "GENIE_MAX_CONCURRENCY", default_value = "0")
    )]
    #[serde(default)]
    pub max_concurrency: usize,

    /// Retry settings for API calls
    #[cfg_attr(feature = "config", clap(flatten))]
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_api_url() -> Url {
    Url::parse(DEFAULT_API_URL).expect("default API URL is valid")
}

fn default_secrets_file() -> PathBuf {
    PathBuf::from(DEFAULT_SECRETS_FILE)
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

impl Default for GenieConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            username: None,
            secrets_file: default_secrets_file(),
            task_mode: TaskMode::default(),
            calc_mode: CalcMode::default(),
            return_data: true,
            overwrite: false,
            overwrite_base_output: false,
            verbose: true,
            http_timeout: default_timeout_secs(),
            user_agent: None,
            max_concurrency: 0,
            retry: RetryConfig::default(),
        }
    }
}

impl GenieConfig {
    /// Creates a configuration for the given endpoint with defaults elsewhere.
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            ..Self::default()
        }
    }

    /// Returns the HTTP timeout, using the default if zero.
    pub fn timeout(&self) -> Duration {
        match self.http_timeout {
            0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Returns the effective user agent.
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("genie/{}", env!("CARGO_PKG_VERSION")))
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the secrets file.
    #[must_use]
    pub fn with_secrets_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.secrets_file = path.into();
        self
    }

    /// Sets the task mode.
    #[must_use]
    pub fn with_task_mode(mut self, task_mode: TaskMode) -> Self {
        self.task_mode = task_mode;
        self
    }

    /// Sets the calculation mode.
    #[must_use]
    pub fn with_calc_mode(mut self, calc_mode: CalcMode) -> Self {
        self.calc_mode = calc_mode;
        self
    }

    /// Sets the retry settings.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Limits the number of tasks in flight per batch.
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GenieConfig::default();
        assert_eq!(config.api_url.as_str(), DEFAULT_API_URL);
        assert_eq!(config.task_mode, TaskMode::Async);
        assert_eq!(config.calc_mode, CalcMode::Async);
        assert!(config.return_data);
        assert!(!config.overwrite);
        assert_eq!(config.timeout(), Duration::from_secs(900));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: GenieConfig = serde_json::from_str(
            r#"{"api_url": "http://localhost:8080/execute", "task_mode": "sync", "calc_mode": "parallel"}"#,
        )
        .unwrap();

        assert_eq!(config.api_url.port(), Some(8080));
        assert_eq!(config.task_mode, TaskMode::Sync);
        assert_eq!(config.calc_mode, CalcMode::Parallel);
        assert!(config.verbose);
        assert_eq!(config.retry, RetryConfig::default());
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(TaskMode::Async.as_ref(), "async");
        assert_eq!(CalcMode::Parallel.to_string(), "parallel");
        assert_eq!("sync".parse::<TaskMode>().unwrap(), TaskMode::Sync);
    }

    #[test]
    fn test_zero_timeout_uses_default() {
        let config = GenieConfig {
            http_timeout: 0,
            ..GenieConfig::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }
}
