#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Charging station normalization and metadata cleanup.
//!
//! [`normalize::normalize_stations`] reduces raw station records to
//! validated coordinates for region resolution. [`metadata`] builds the
//! flattened station detail table (whitelisted metadata, unique column
//! names, backfilled nulls, no duplicate rows).

pub mod columns;
pub mod metadata;
pub mod normalize;

pub use ev_map_station_models::{NormalizedStation, RawStation, StationTable};
pub use metadata::{METADATA_KEYS, build_station_table};
pub use normalize::normalize_stations;

/// Why a single raw station record was rejected.
///
/// Rejections are logged and skipped; they never fail a run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedStation {
    /// The record is not an object or has wrongly typed fields.
    #[error("record does not match the station schema: {0}")]
    Schema(String),

    /// A required coordinate is missing or null.
    #[error("missing {0}")]
    Missing(&'static str),

    /// A coordinate is present but not a finite number.
    #[error("{field} is not a finite number: {value}")]
    NotNumeric {
        /// Which coordinate.
        field: &'static str,
        /// The offending value as it appeared in the record.
        value: String,
    },
}
