//! Transport-level errors and their mapping onto [`genie_core::Error`].

use reqwest::StatusCode;
use thiserror::Error;

/// Maximum number of response body bytes kept in an error message.
const MAX_BODY_LEN: usize = 512;

/// Error raised while talking to the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// The request or response body could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// The API answered with a non-success status.
    #[error("API returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: StatusCode,
        /// Response body, truncated.
        body: String,
    },
}

impl ApiError {
    /// Creates a status error, truncating long bodies.
    pub fn status(status: StatusCode, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > MAX_BODY_LEN {
            let mut end = MAX_BODY_LEN;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
            body.push_str("...");
        }

        Self::Status { status, body }
    }
}

impl From<ApiError> for genie_core::Error {
    fn from(error: ApiError) -> Self {
        use genie_core::Error;

        match error {
            ApiError::Reqwest(e) => {
                if e.is_timeout() {
                    Error::timeout().with_message(e.to_string()).with_source(e)
                } else if e.is_connect() {
                    Error::network_error()
                        .with_message("Connection failed")
                        .with_source(e)
                } else if e.is_decode() {
                    Error::serialization().with_message(e.to_string()).with_source(e)
                } else {
                    Error::network_error().with_message(e.to_string()).with_source(e)
                }
            }
            ApiError::Serde(e) => Error::serialization().with_message(e.to_string()).with_source(e),
            ApiError::Status { status, .. } => {
                let base = match status {
                    StatusCode::TOO_MANY_REQUESTS => Error::rate_limited(),
                    StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Error::timeout(),
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::authentication(),
                    StatusCode::NOT_FOUND => Error::not_found(),
                    s if s.is_server_error() => Error::service_unavailable(),
                    s if s.is_client_error() => Error::invalid_input(),
                    _ => Error::external_error(),
                };
                let message = error.to_string();
                base.with_message(message).with_source(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use genie_core::ErrorKind;

    use super::*;

    fn kind(status: StatusCode) -> ErrorKind {
        genie_core::Error::from(ApiError::status(status, "body")).kind()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(kind(StatusCode::TOO_MANY_REQUESTS), ErrorKind::RateLimited);
        assert_eq!(kind(StatusCode::BAD_GATEWAY), ErrorKind::ServiceUnavailable);
        assert_eq!(kind(StatusCode::INTERNAL_SERVER_ERROR), ErrorKind::ServiceUnavailable);
        assert_eq!(kind(StatusCode::GATEWAY_TIMEOUT), ErrorKind::Timeout);
        assert_eq!(kind(StatusCode::UNAUTHORIZED), ErrorKind::Authentication);
        assert_eq!(kind(StatusCode::BAD_REQUEST), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_retryable_statuses() {
        let retryable = |status| genie_core::Error::from(ApiError::status(status, "")).is_retryable();

        assert!(retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!retryable(StatusCode::BAD_REQUEST));
        assert!(!retryable(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let ApiError::Status { body, .. } = ApiError::status(StatusCode::BAD_REQUEST, "x".repeat(2000))
        else {
            unreachable!()
        };
        assert_eq!(body.len(), MAX_BODY_LEN + 3);
    }
}
