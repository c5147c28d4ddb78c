//! Storage backend implementation.

use std::time::Instant;

use bytes::Bytes;
use genie_core::{OutputRef, OutputStore, ServiceHealth};
use opendal::{Operator, services};

use crate::TRACING_TARGET;
use crate::config::{BackendType, StorageConfig};
use crate::error::{StorageError, StorageResult};

/// Output store over an OpenDAL operator.
///
/// Locations of [`OutputRef`]s are used as paths relative to the configured
/// root.
///
/// # Examples
///
/// ```rust,ignore
/// use genie_opendal::{StorageBackend, StorageConfig};
///
/// let backend = StorageBackend::new(StorageConfig::fs("/tmp/genie"))?;
/// backend.write("acme/pagenum=1/text.csv", b"text\nRevenue\n").await?;
/// let files = backend.list("acme/").await?;
/// ```
#[derive(Clone)]
pub struct StorageBackend {
    operator: Operator,
    config: StorageConfig,
}

impl StorageBackend {
    /// Creates a new storage backend from configuration.
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        let operator = Self::create_operator(&config)?;

        tracing::info!(
            target: TRACING_TARGET,
            backend = %config.backend,
            root = %config.root,
            "Storage backend initialized"
        );

        Ok(Self { operator, config })
    }

    /// Returns the configuration for this backend.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Returns the backend type.
    pub fn backend_type(&self) -> BackendType {
        self.config.backend
    }

    /// Reads a file from storage.
    pub async fn read(&self, path: &str) -> StorageResult<Bytes> {
        tracing::debug!(target: TRACING_TARGET, path = %path, "Reading file");

        let data = self.operator.read(path).await?.to_bytes();

        tracing::debug!(
            target: TRACING_TARGET,
            path = %path,
            size = data.len(),
            "File read complete"
        );

        Ok(data)
    }

    /// Writes data to a file, creating parent directories as needed.
    pub async fn write(&self, path: &str, data: impl Into<Bytes>) -> StorageResult<()> {
        let data = data.into();
        tracing::debug!(
            target: TRACING_TARGET,
            path = %path,
            size = data.len(),
            "Writing file"
        );

        self.operator.write(path, data).await?;
        Ok(())
    }

    /// Deletes a file. Deleting a missing file succeeds.
    pub async fn delete(&self, path: &str) -> StorageResult<()> {
        tracing::debug!(target: TRACING_TARGET, path = %path, "Deleting file");

        self.operator.delete(path).await?;
        Ok(())
    }

    /// Checks if a file exists.
    pub async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.operator.exists(path).await?)
    }

    /// Gets metadata for a file.
    pub async fn stat(&self, path: &str) -> StorageResult<FileMetadata> {
        let meta = self.operator.stat(path).await?;

        let last_modified = meta
            .last_modified()
            .and_then(|dt| jiff::Timestamp::from_second(dt.timestamp()).ok());

        Ok(FileMetadata {
            size: meta.content_length(),
            last_modified,
            content_type: meta.content_type().map(str::to_owned),
        })
    }

    /// Lists the files directly under a directory, sorted by path.
    ///
    /// Directories are given with a trailing `/`. Subdirectories are skipped.
    pub async fn list(&self, path: &str) -> StorageResult<Vec<String>> {
        let entries = self.operator.list(path).await?;

        let mut files: Vec<String> = entries
            .into_iter()
            .filter(|entry| entry.metadata().mode().is_file())
            .map(|entry| entry.path().to_owned())
            .collect();
        files.sort();

        tracing::debug!(
            target: TRACING_TARGET,
            path = %path,
            count = files.len(),
            "Listed files"
        );

        Ok(files)
    }

    fn create_operator(config: &StorageConfig) -> StorageResult<Operator> {
        let operator = match config.backend {
            BackendType::Fs => {
                let builder = services::Fs::default().root(&config.root);
                Operator::new(builder).map(|op| op.finish())
            }
            BackendType::Memory => {
                let builder = services::Memory::default().root(&config.root);
                Operator::new(builder).map(|op| op.finish())
            }
            #[cfg(feature = "s3")]
            BackendType::S3 => {
                let bucket = config
                    .bucket
                    .as_deref()
                    .ok_or_else(|| StorageError::init("s3 backend requires a bucket"))?;

                let mut builder = services::S3::default().bucket(bucket).root(&config.root);

                if let Some(ref region) = config.region {
                    builder = builder.region(region);
                }

                if let Some(ref endpoint) = config.endpoint {
                    builder = builder.endpoint(endpoint);
                }

                if let Some(ref access_key_id) = config.access_key_id {
                    builder = builder.access_key_id(access_key_id);
                }

                if let Some(ref secret_access_key) = config.secret_access_key {
                    builder = builder.secret_access_key(secret_access_key);
                }

                Operator::new(builder).map(|op| op.finish())
            }
            #[cfg(not(feature = "s3"))]
            BackendType::S3 => {
                return Err(StorageError::init(
                    "s3 backend requires the `s3` feature of genie-opendal",
                ));
            }
        };

        operator.map_err(|e| StorageError::init(e.to_string()))
    }
}

#[async_trait::async_trait]
impl OutputStore for StorageBackend {
    async fn exists(&self, output: &OutputRef) -> genie_core::Result<bool> {
        Ok(StorageBackend::exists(self, output.location()).await?)
    }

    async fn read(&self, output: &OutputRef) -> genie_core::Result<Bytes> {
        Ok(StorageBackend::read(self, output.location()).await?)
    }

    async fn health_check(&self) -> genie_core::Result<ServiceHealth> {
        let started_at = Instant::now();

        let health = ServiceHealth::from_check(self.operator.check().await);

        Ok(health
            .with_latency(started_at.elapsed())
            .with_metric("backend", self.config.backend.as_ref()))
    }
}

/// File metadata.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: Option<jiff::Timestamp>,
    /// Content type / MIME type.
    pub content_type: Option<String>,
}

impl std::fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageBackend")
            .field("backend", &self.config.backend)
            .field("root", &self.config.root)
            .finish_non_exhaustive()
    }
}
