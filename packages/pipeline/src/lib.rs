#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Charging station pipeline.
//!
//! Fetches charging stations, region boundaries and vehicle registrations,
//! resolves every station to the region containing it and persists one row
//! per region: `(state_name, count_of_ev_charging_stations,
//! count_of_ev_vehicles)`.
//!
//! ```ignore
//! let config = PipelineConfig::load(None)?;
//! let report = Pipeline::from_config(config)?.run().await?;
//! ```

pub mod config;
pub mod orchestrator;
pub mod state;

use ev_map_database::DbError;
use ev_map_region::RegionError;
use ev_map_source::SourceError;

pub use config::{ConfigError, PipelineConfig};
pub use orchestrator::{Pipeline, PipelineSources, RunReport, fetch_resolver, merge_counts};
pub use state::PipelineState;

/// Errors that can end a pipeline attempt or run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A source could not be fetched or decoded.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The boundary dataset could not be turned into regions.
    #[error(transparent)]
    Region(#[from] RegionError),

    /// The output could not be written.
    #[error(transparent)]
    Database(#[from] DbError),

    /// The configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Every whole-run attempt failed.
    #[error("Pipeline failed after {attempts} attempt(s): {last}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The error that ended the last attempt.
        #[source]
        last: Box<PipelineError>,
    },
}
