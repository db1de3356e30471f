#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Row types for the output database.
//!
//! These are the shapes handed to the persistence layer at the end of a
//! successful run. They are distinct from the raw and normalized record
//! types in `ev_map_station_models`.

use ev_map_station_models::StationTable;
use serde::{Deserialize, Serialize};

/// One row of the `charging_stations` table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AggregateRow {
    /// Region name (`state_name` column).
    pub region_name: String,
    /// Stations resolved into this region.
    pub station_count: u64,
    /// Registered EVs in this region.
    pub vehicle_count: u64,
}

impl AggregateRow {
    /// Creates a new row.
    #[must_use]
    pub fn new(region_name: impl Into<String>, station_count: u64, vehicle_count: u64) -> Self {
        Self {
            region_name: region_name.into(),
            station_count,
            vehicle_count,
        }
    }
}

/// Everything a run persists, replaced as a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    /// Aggregate rows, unique by region name and sorted by it.
    pub rows: Vec<AggregateRow>,
    /// Cleaned station detail table, when enabled.
    pub station_details: Option<StationTable>,
}
