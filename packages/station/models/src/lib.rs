#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Charging station record types.
//!
//! [`RawStation`] is the strict schema a raw station record must satisfy
//! before it is allowed past normalization. [`NormalizedStation`] is what
//! the resolver consumes. [`StationTable`] is the cleaned, flattened
//! station detail table persisted alongside the aggregate.

use ev_map_region_models::Coordinate;
use serde::{Deserialize, Serialize};

/// A JSON value that may carry a number either natively or as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    /// A JSON number.
    Number(f64),
    /// A JSON string, expected to hold a number.
    Text(String),
}

impl NumberOrText {
    /// Returns the finite numeric value, or `None` if the text does not
    /// parse or the value is not finite.
    #[must_use]
    pub fn as_finite_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl std::fmt::Display for NumberOrText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// The fields of a raw station record the pipeline depends on.
///
/// All other fields are ignored here; they only matter to the station
/// detail table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStation {
    /// Latitude, possibly stringified.
    #[serde(default)]
    pub lat: Option<NumberOrText>,
    /// Longitude, possibly stringified.
    #[serde(default)]
    pub lng: Option<NumberOrText>,
}

/// A station reduced to its validated location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedStation {
    /// Where the station is.
    pub coordinate: Coordinate,
}

/// The cleaned station detail table.
///
/// Column names are unique; every row has exactly one value per column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationTable {
    /// Column names, in output order.
    pub columns: Vec<String>,
    /// Row values aligned with [`Self::columns`].
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl StationTable {
    /// Position of `name` in [`Self::columns`].
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of column `name` in row `row`.
    #[must_use]
    pub fn value(&self, row: usize, name: &str) -> Option<&serde_json::Value> {
        let col = self.column_index(name)?;
        self.rows.get(row)?.get(col)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
