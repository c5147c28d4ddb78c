//! Storage configuration types.

#[cfg(feature = "config")]
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Storage service behind a [`StorageBackend`](crate::StorageBackend).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BackendType {
    /// Local filesystem rooted at `root`.
    #[default]
    Fs,
    /// Process-local memory, lost on exit.
    Memory,
    /// Amazon S3 compatible storage; `root` is the path prefix in the bucket.
    S3,
}

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct StorageConfig {
    /// Storage service for staged outputs
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-backend", env = "GENIE_STORAGE_BACKEND", value_enum, default_value = "fs")
    )]
    #[serde(default)]
    pub backend: BackendType,

    /// Root directory or key prefix
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-root", env = "GENIE_STORAGE_ROOT", default_value = "./outputs")
    )]
    #[serde(default = "default_root")]
    pub root: String,

    /// S3 bucket name
    #[cfg_attr(feature = "config", arg(long = "s3-bucket", env = "GENIE_S3_BUCKET"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    /// S3 region
    #[cfg_attr(feature = "config", arg(long = "s3-region", env = "GENIE_S3_REGION"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible storage such as MinIO
    #[cfg_attr(feature = "config", arg(long = "s3-endpoint", env = "GENIE_S3_ENDPOINT"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// S3 access key ID
    #[cfg_attr(feature = "config", arg(long = "s3-access-key-id", env = "GENIE_S3_ACCESS_KEY_ID"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    /// S3 secret access key
    #[cfg_attr(
        feature = "config",
        arg(long = "s3-secret-access-key", env = "GENIE_S3_SECRET_ACCESS_KEY", hide_env_values = true)
    )]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            root: default_root(),
            bucket: None,
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

impl StorageConfig {
    /// Creates a filesystem configuration rooted at `root`.
    pub fn fs(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Creates an in-memory configuration.
    pub fn memory() -> Self {
        Self {
            backend: BackendType::Memory,
            root: "/".to_owned(),
            ..Self::default()
        }
    }

    /// Creates an S3 configuration for `bucket`.
    pub fn s3(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            backend: BackendType::S3,
            root: "/".to_owned(),
            bucket: Some(bucket.into()),
            region: Some(region.into()),
            ..Self::default()
        }
    }

    /// Sets the custom endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the access credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Sets the root directory or key prefix.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }
}

fn default_root() -> String {
    "./outputs".to_owned()
}
