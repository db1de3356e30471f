//! Reduces raw station records to validated coordinates.

use ev_map_region_models::Coordinate;
use ev_map_station_models::{NormalizedStation, NumberOrText, RawStation};
use serde::Deserialize as _;

use crate::MalformedStation;

/// Normalizes raw station records, dropping any record without a usable
/// latitude and longitude.
///
/// Each rejection is logged as a warning; the input is never modified, so
/// the output can be re-derived from the same records at any time.
#[must_use]
pub fn normalize_stations(records: &[serde_json::Value]) -> Vec<NormalizedStation> {
    let stations: Vec<NormalizedStation> = records
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| match normalize_station(record) {
            Ok(station) => Some(station),
            Err(e) => {
                log::warn!("Skipping station record {idx}: {e}");
                None
            }
        })
        .collect();

    log::info!(
        "Normalized {} of {} station records ({} dropped)",
        stations.len(),
        records.len(),
        records.len() - stations.len()
    );

    stations
}

/// Validates one raw record.
///
/// # Errors
///
/// Returns [`MalformedStation`] if the record does not match the
/// [`RawStation`] schema or either coordinate is missing or non-numeric.
pub fn normalize_station(
    record: &serde_json::Value,
) -> Result<NormalizedStation, MalformedStation> {
    let raw = RawStation::deserialize(record)
        .map_err(|e| MalformedStation::Schema(e.to_string()))?;

    let latitude = coordinate_value("lat", raw.lat.as_ref())?;
    let longitude = coordinate_value("lng", raw.lng.as_ref())?;

    Coordinate::new(latitude, longitude)
        .map(|coordinate| NormalizedStation { coordinate })
        .ok_or_else(|| MalformedStation::NotNumeric {
            field: "lat",
            value: latitude.to_string(),
        })
}

fn coordinate_value(
    field: &'static str,
    value: Option<&NumberOrText>,
) -> Result<f64, MalformedStation> {
    let value = value.ok_or(MalformedStation::Missing(field))?;
    value
        .as_finite_f64()
        .ok_or_else(|| MalformedStation::NotNumeric {
            field,
            value: value.to_string(),
        })
}
