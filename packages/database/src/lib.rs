#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `DuckDB` persistence for the charging station aggregate.
//!
//! The output database lives at `data/charging_station.duckdb` by default.
//! Every successful run replaces its tables in a single transaction, so a
//! reader only ever sees the previous run or the new one.

pub mod output_db;
pub mod paths;

use std::path::{Path, PathBuf};

pub use ev_map_database_models::{AggregateRow, RunOutput};

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Destination for the output of a successful run.
pub trait OutputSink: Send + Sync {
    /// Replaces all previously persisted output with `output`.
    ///
    /// Returns the number of aggregate rows written.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the output cannot be written. Nothing is
    /// replaced in that case.
    fn replace_output(&mut self, output: &RunOutput) -> Result<u64, DbError>;
}

/// [`OutputSink`] backed by a `DuckDB` file.
///
/// The connection is opened per write so the sink can be held across
/// `.await` points.
#[derive(Debug, Clone)]
pub struct DuckDbSink {
    path: PathBuf,
}

impl DuckDbSink {
    /// Creates a sink writing to the database at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The database file this sink writes to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputSink for DuckDbSink {
    fn replace_output(&mut self, output: &RunOutput) -> Result<u64, DbError> {
        let conn = output_db::open(&self.path)?;
        let written = output_db::replace_output(&conn, output, chrono::Utc::now())?;
        log::info!("Wrote {written} rows to {}", self.path.display());
        Ok(written)
    }
}
