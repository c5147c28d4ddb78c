//! Storage error types.

use genie_core::{Error, ErrorKind};

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to initialize the storage backend.
    #[error("storage initialization failed: {0}")]
    Init(String),

    /// File or object not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Backend-specific error.
    #[error("backend error: {0}")]
    Backend(opendal::Error),
}

impl StorageError {
    /// Creates a new initialization error.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Returns `true` if the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            opendal::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::Backend(err),
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        let kind = match &err {
            StorageError::Init(_) => ErrorKind::Configuration,
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::PermissionDenied(_) => ErrorKind::Authentication,
            StorageError::Backend(e) if e.is_temporary() => ErrorKind::ServiceUnavailable,
            StorageError::Backend(_) => ErrorKind::ExternalError,
        };

        Error::from_source(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_core_kind() {
        let err = opendal::Error::new(opendal::ErrorKind::NotFound, "missing");
        let storage = StorageError::from(err);
        assert!(storage.is_not_found());

        let core = Error::from(storage);
        assert!(core.is_not_found());
    }

    #[test]
    fn test_temporary_backend_error_is_retryable() {
        let err = opendal::Error::new(opendal::ErrorKind::Unexpected, "flaky").set_temporary();
        let core = Error::from(StorageError::from(err));
        assert_eq!(core.kind(), ErrorKind::ServiceUnavailable);
        assert!(core.is_retryable());

        let err = opendal::Error::new(opendal::ErrorKind::Unexpected, "broken");
        assert_eq!(Error::from(StorageError::from(err)).kind(), ErrorKind::ExternalError);
    }

    #[test]
    fn test_init_is_configuration() {
        let core = Error::from(StorageError::init("no bucket"));
        assert_eq!(core.kind(), ErrorKind::Configuration);
    }
}
