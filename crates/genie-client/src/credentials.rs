//! API credentials.

use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

use genie_core::{Error, Result};
use serde::Deserialize;

use crate::{GenieConfig, TRACING_TARGET};

/// API key and username sent with tasks.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    #[serde(rename = "BYTE_GENIE_KEY", default)]
    api_key: String,
    #[serde(rename = "USERNAME", default)]
    username: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("username", &self.username)
            .finish()
    }
}

impl Credentials {
    /// Creates credentials from explicit values.
    pub fn new(api_key: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            username: username.into(),
        }
    }

    /// Reads credentials from a JSON secrets file.
    ///
    /// A missing file yields empty credentials. An unreadable or malformed
    /// file is a configuration error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == IoErrorKind::NotFound => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    path = %path.display(),
                    "Secrets file not found, using empty credentials"
                );
                return Ok(Self::default());
            }
            Err(error) => {
                return Err(Error::configuration()
                    .with_message(format!("cannot read secrets file {}", path.display()))
                    .with_source(error));
            }
        };

        serde_json::from_str(&contents).map_err(|error| {
            Error::configuration()
                .with_message(format!("malformed secrets file {}", path.display()))
                .with_source(error)
        })
    }

    /// Resolves credentials for a configuration: explicit values win over
    /// the secrets file.
    pub fn resolve(config: &GenieConfig) -> Result<Self> {
        if let (Some(api_key), Some(username)) = (&config.api_key, &config.username) {
            return Ok(Self::new(api_key.clone(), username.clone()));
        }

        let mut credentials = Self::from_file(&config.secrets_file)?;
        if let Some(api_key) = &config.api_key {
            credentials.api_key = api_key.clone();
        }
        if let Some(username) = &config.username {
            credentials.username = username.clone();
        }

        Ok(credentials)
    }

    /// Returns the API key, possibly empty.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the username, possibly empty.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns true if no API key is configured.
    pub fn is_anonymous(&self) -> bool {
        self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use genie_core::ErrorKind;

    use super::*;

    #[test]
    fn test_missing_file_gives_empty_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let credentials = Credentials::from_file(dir.path().join("secrets.json")).unwrap();

        assert!(credentials.is_anonymous());
        assert_eq!(credentials.username(), "");
    }

    #[test]
    fn test_reads_secrets_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(&path, r#"{"BYTE_GENIE_KEY": "key-123", "USERNAME": "analyst"}"#).unwrap();

        let credentials = Credentials::from_file(&path).unwrap();
        assert_eq!(credentials.api_key(), "key-123");
        assert_eq!(credentials.username(), "analyst");
    }

    #[test]
    fn test_malformed_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(&path, "not json").unwrap();

        let error = Credentials::from_file(&path).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_explicit_values_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(&path, r#"{"BYTE_GENIE_KEY": "from-file", "USERNAME": "file-user"}"#)
            .unwrap();

        let config = GenieConfig::default()
            .with_secrets_file(&path)
            .with_api_key("from-config");
        let credentials = Credentials::resolve(&config).unwrap();

        assert_eq!(credentials.api_key(), "from-config");
        assert_eq!(credentials.username(), "file-user");
    }

    #[test]
    fn test_debug_hides_api_key() {
        let credentials = Credentials::new("secret", "analyst");
        assert!(!format!("{credentials:?}").contains("secret"));
    }
}
