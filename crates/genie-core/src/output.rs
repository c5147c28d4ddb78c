//! References to outputs produced by remote jobs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Location of a job output plus a structured metadata record.
///
/// The location is opaque: it is only ever checked for existence and read.
/// Anything a caller needs to join on (document name, page number, format)
/// lives in `metadata` instead of being sliced out of the location string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputRef {
    location: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, String>,
}

impl OutputRef {
    /// Creates a reference with no metadata.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Creates a reference from an object path whose segments follow the
    /// `key=value` convention, lifting every such segment into metadata.
    ///
    /// ```
    /// use genie_core::OutputRef;
    ///
    /// let output = OutputRef::from_legacy_path(
    ///     "gs://bucket/entity=acme-2023-reportpdf/data_type=semi-structured/format=csv/pagenum=4/text.csv",
    /// );
    /// assert_eq!(output.meta("entity"), Some("acme-2023-reportpdf"));
    /// assert_eq!(output.meta("pagenum"), Some("4"));
    /// assert_eq!(output.format(), Some("csv"));
    /// ```
    pub fn from_legacy_path(path: impl Into<String>) -> Self {
        let location = path.into();
        let metadata = location
            .split('/')
            .filter_map(|segment| segment.split_once('='))
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (key.to_owned(), value.to_owned()))
            .collect();

        Self { location, metadata }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the opaque location.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Returns a metadata value.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Returns the full metadata record.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Returns the output format: the `format` metadata entry, falling back
    /// to the extension of the final path segment.
    pub fn format(&self) -> Option<&str> {
        self.meta("format").or_else(|| {
            self.location
                .rsplit('/')
                .next()
                .and_then(|name| name.rsplit_once('.'))
                .map(|(_, extension)| extension)
                .filter(|extension| !extension.is_empty())
        })
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

impl From<String> for OutputRef {
    fn from(location: String) -> Self {
        Self::new(location)
    }
}

impl From<&str> for OutputRef {
    fn from(location: &str) -> Self {
        Self::new(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "gs://db-genie/entity_type=url/entity=acme-2023-reportpdf/\
                        data_type=semi-structured/format=csv/variable_desc=text-blocks/\
                        source=layout-genie/pagenum=12_text-blocks.csv";

    #[test]
    fn test_legacy_path_metadata() {
        let output = OutputRef::from_legacy_path(PATH);

        assert_eq!(output.location(), PATH);
        assert_eq!(output.meta("entity_type"), Some("url"));
        assert_eq!(output.meta("entity"), Some("acme-2023-reportpdf"));
        assert_eq!(output.meta("variable_desc"), Some("text-blocks"));
        assert_eq!(output.meta("source"), Some("layout-genie"));
        assert_eq!(output.meta("pagenum"), Some("12_text-blocks.csv"));
        assert_eq!(output.format(), Some("csv"));
    }

    #[test]
    fn test_plain_segments_are_ignored() {
        let output = OutputRef::from_legacy_path("bucket/plain/=orphan/key=value");
        assert_eq!(output.metadata().len(), 1);
        assert_eq!(output.meta("key"), Some("value"));
    }

    #[test]
    fn test_format_falls_back_to_extension() {
        assert_eq!(OutputRef::new("tmp/result.json").format(), Some("json"));
        assert_eq!(OutputRef::new("tmp/result").format(), None);
        assert_eq!(OutputRef::new("tmp.d/result").format(), None);
    }

    #[test]
    fn test_display_is_location() {
        let output = OutputRef::new("tmp/out.csv").with_meta("doc_name", "acme");
        assert_eq!(output.to_string(), "tmp/out.csv");
    }

    #[test]
    fn test_serde_round_trip_skips_empty_metadata() {
        let json = serde_json::to_string(&OutputRef::new("a/b.csv")).unwrap();
        assert_eq!(json, r#"{"location":"a/b.csv"}"#);

        let output: OutputRef =
            serde_json::from_str(r#"{"location":"a/b.csv","metadata":{"pagenum":"3"}}"#).unwrap();
        assert_eq!(output.meta("pagenum"), Some("3"));
    }
}
