#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Data source definition types.
//!
//! Defines the TOML schema for the three datasets the pipeline consumes
//! (stations, boundaries, population) and the per-source retry policy.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// The role a dataset plays in the pipeline.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    /// Point-located charging stations.
    Stations,
    /// Region boundary polygons.
    Boundaries,
    /// Per-state vehicle registration counts.
    Population,
}

/// A data source, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDefinition {
    /// Unique source identifier (e.g., `"us_ev_stations"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Where the payload is fetched from.
    pub location: SourceLocation,
    /// Retry policy for this source.
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl SourceDefinition {
    /// Returns the source identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the human-readable source name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Where a source's payload lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceLocation {
    /// Fetched with an HTTP GET.
    Http {
        /// Full URL returning the payload.
        url: String,
    },
    /// Read from the local filesystem.
    File {
        /// Path to the payload file.
        path: PathBuf,
    },
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http { url } => f.write_str(url),
            Self::File { path } => write!(f, "{}", path.display()),
        }
    }
}

/// Bounded retry with exponential backoff.
///
/// After failed attempt `n` (starting at 1) the fetcher sleeps
/// `backoff_base ^ n` seconds before trying again, until `max_attempts`
/// attempts have been made.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Base of the exponential backoff, in seconds.
    pub backoff_base: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, backoff_base: f64) -> Self {
        Self {
            max_attempts,
            backoff_base,
        }
    }

    /// Checks that the policy can be executed.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if `max_attempts` is zero or
    /// `backoff_base` is negative or not finite.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if !self.backoff_base.is_finite() || self.backoff_base < 0.0 {
            return Err(format!(
                "backoff_base must be a finite non-negative number, got {}",
                self.backoff_base
            ));
        }
        Ok(())
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    ///
    /// Saturates at [`Duration::MAX`] instead of overflowing.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        Duration::try_from_secs_f64(self.backoff_base.powi(exponent)).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_exponential_in_attempt() {
        let policy = RetryPolicy::new(5, 2.0);
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(8));
    }

    #[test]
    fn zero_base_never_sleeps() {
        let policy = RetryPolicy::new(3, 0.0);
        assert_eq!(policy.backoff(1), Duration::ZERO);
        assert_eq!(policy.backoff(2), Duration::ZERO);
    }

    #[test]
    fn huge_backoff_saturates() {
        let policy = RetryPolicy::new(3, 1e10);
        assert_eq!(policy.backoff(100), Duration::MAX);
    }

    #[test]
    fn validate_rejects_bad_policies() {
        assert!(RetryPolicy::new(0, 2.0).validate().is_err());
        assert!(RetryPolicy::new(3, -1.0).validate().is_err());
        assert!(RetryPolicy::new(3, f64::NAN).validate().is_err());
        assert!(RetryPolicy::new(1, 0.0).validate().is_ok());
    }

    #[test]
    fn deserializes_source_definition_from_toml() {
        let source: SourceDefinition = toml::from_str(
            r#"
            id = "registrations"
            name = "EV registrations by state"

            [location]
            type = "file"
            path = "data/registrations.json"

            [retry]
            max_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(source.id(), "registrations");
        assert_eq!(
            source.location,
            SourceLocation::File {
                path: PathBuf::from("data/registrations.json")
            }
        );
        assert_eq!(source.retry.max_attempts, 5);
        assert!((source.retry.backoff_base - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn retry_defaults_when_omitted() {
        let source: SourceDefinition = toml::from_str(
            r#"
            id = "stations"
            name = "Stations"
            location = { type = "http", url = "https://example.com/stations.json" }
            "#,
        )
        .unwrap();
        assert_eq!(source.retry, RetryPolicy::default());
        assert_eq!(source.location.to_string(), "https://example.com/stations.json");
    }

    #[test]
    fn source_kind_display() {
        assert_eq!(SourceKind::Boundaries.to_string(), "boundaries");
    }
}
