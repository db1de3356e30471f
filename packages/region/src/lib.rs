#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Boundary parsing and point-to-region resolution.
//!
//! [`boundary::parse_boundaries`] turns a `GeoJSON` `FeatureCollection`
//! into [`Region`]s, and [`resolver::RegionResolver`] answers "which region
//! contains this station?" for every normalized coordinate in a run.

pub mod boundary;
pub mod resolver;

pub use boundary::{DEFAULT_NAME_PROPERTY, parse_boundaries};
pub use ev_map_region_models::{AxisOrder, Coordinate, Region, RegionShape, Ring};
pub use resolver::{RegionResolver, Resolution};

/// Errors that can occur while building regions from boundary data.
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    /// The payload could not be parsed as JSON.
    #[error("Boundary JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload parsed but is not a usable boundary dataset.
    #[error("Malformed boundary data: {message}")]
    Malformed {
        /// Description of what went wrong.
        message: String,
    },
}
