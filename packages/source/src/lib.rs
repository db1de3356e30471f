#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Data source trait, fetch implementations, and retry policy.
//!
//! Each dataset the pipeline consumes is a [`DataSource`]. Sources only
//! know how to produce raw bytes; [`retry::fetch_with_retry`] wraps any of
//! them with bounded retries and decodes the payload, escalating to
//! [`SourceError::Unavailable`] once the policy is exhausted.

pub mod fetch;
pub mod progress;
pub mod retry;
pub mod snapshot;

use async_trait::async_trait;

pub use ev_map_source_models::{RetryPolicy, SourceDefinition, SourceKind, SourceLocation};
pub use fetch::{FileSource, HttpSource, build_http_client, source_from_definition};

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// The payload arrived but is not in the expected shape.
    #[error("Malformed payload: {message}")]
    Malformed {
        /// Description of what went wrong.
        message: String,
    },

    /// Every attempt allowed by the retry policy failed.
    #[error("Source {source_id} unavailable after {attempts} attempt(s): {cause}")]
    Unavailable {
        /// Identifier of the failing source.
        source_id: String,
        /// Number of attempts made.
        attempts: u32,
        /// The last underlying error.
        #[source]
        cause: Box<SourceError>,
    },
}

/// A dataset that can be fetched as raw bytes.
///
/// Implementations perform exactly one fetch per call; retrying is the
/// caller's concern (see [`retry::fetch_with_retry`]).
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Returns a unique identifier for this source (e.g., `"us_ev_stations"`).
    fn id(&self) -> &str;

    /// Returns the human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetches the full payload.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the payload cannot be retrieved.
    async fn fetch(&self) -> Result<Vec<u8>, SourceError>;
}

/// Decodes a payload that must be a JSON array of records.
///
/// # Errors
///
/// Returns [`SourceError::Json`] if the payload is not JSON and
/// [`SourceError::Malformed`] if it is JSON but not an array.
pub fn decode_json_records(bytes: &[u8]) -> Result<Vec<serde_json::Value>, SourceError> {
    match serde_json::from_slice::<serde_json::Value>(bytes)? {
        serde_json::Value::Array(records) => Ok(records),
        other => Err(SourceError::Malformed {
            message: format!("expected a JSON array of records, got {}", json_type(&other)),
        }),
    }
}

const fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_record_arrays() {
        let records = decode_json_records(br#"[{"lat": 1.0}, {"lat": 2.0}]"#).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn rejects_non_array_payloads() {
        let err = decode_json_records(br#"{"rows": []}"#).unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
        assert!(err.to_string().contains("an object"));
    }

    #[test]
    fn rejects_truncated_json() {
        let err = decode_json_records(br#"[{"lat": 1.0"#).unwrap_err();
        assert!(matches!(err, SourceError::Json(_)));
    }

    #[test]
    fn unavailable_carries_last_cause() {
        let err = SourceError::Unavailable {
            source_id: "stations".to_string(),
            attempts: 3,
            cause: Box::new(SourceError::Status {
                url: "https://example.com".to_string(),
                status: 503,
            }),
        };
        assert_eq!(
            err.to_string(),
            "Source stations unavailable after 3 attempt(s): HTTP 503 from https://example.com"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
