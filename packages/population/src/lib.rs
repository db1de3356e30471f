#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-region EV registration counts.
//!
//! Registration records carry battery-electric and plug-in hybrid counts
//! as comma-grouped integer strings (`"1,000"`). [`aggregate_population`]
//! sums the two per record and keys the result by state name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A field that may be a JSON string or number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum CountField {
    Number(u64),
    Text(String),
}

/// The fields of a registration record the aggregate depends on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawPopulationRecord {
    #[serde(rename = "Electric (EV)", default)]
    electric: Option<CountField>,
    #[serde(rename = "Plug-In Hybrid Electric (PHEV)", default)]
    plug_in_hybrid: Option<CountField>,
    #[serde(rename = "State", default)]
    state: Option<String>,
}

/// Why a single registration record was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedRecord {
    /// The record is not an object or has wrongly typed fields.
    #[error("record does not match the registration schema: {0}")]
    Schema(String),

    /// A required field is missing, null or blank.
    #[error("missing {0:?}")]
    Missing(&'static str),

    /// A count is not a non-negative integer.
    #[error("{field:?} is not a count: {value:?}")]
    NotNumeric {
        /// Which field.
        field: &'static str,
        /// The offending text.
        value: String,
    },

    /// The two counts do not fit in a `u64` together.
    #[error("vehicle count overflows")]
    Overflow,
}

/// Region name to total registered EVs (BEV + PHEV).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionPopulation(BTreeMap<String, u64>);

impl RegionPopulation {
    /// Count for `region`, or 0 if the region has no record.
    #[must_use]
    pub fn get(&self, region: &str) -> u64 {
        self.0.get(region).copied().unwrap_or(0)
    }

    /// Sets the count for `region`, returning the value it replaced.
    pub fn insert(&mut self, region: String, count: u64) -> Option<u64> {
        self.0.insert(region, count)
    }

    /// Number of regions with a record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no region has a record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates regions in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(name, count)| (name.as_str(), *count))
    }
}

impl FromIterator<(String, u64)> for RegionPopulation {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Parses a count that may use `,` as a thousands separator.
///
/// Returns `None` for empty, negative, fractional or overflowing input.
#[must_use]
pub fn parse_grouped_count(text: &str) -> Option<u64> {
    let digits: String = text.trim().chars().filter(|c| *c != ',').collect();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Sums BEV and PHEV counts per state.
///
/// Malformed records are skipped with a warning. When a state appears more
/// than once the last record wins.
#[must_use]
pub fn aggregate_population(records: &[serde_json::Value]) -> RegionPopulation {
    let mut population = RegionPopulation::default();
    let mut skipped = 0usize;

    for (idx, record) in records.iter().enumerate() {
        match parse_record(record) {
            Ok((state, count)) => {
                if let Some(previous) = population.insert(state.clone(), count) {
                    log::debug!("Population for {state} replaced: {previous} -> {count}");
                }
            }
            Err(e) => {
                skipped += 1;
                log::warn!("Skipping population record {idx}: {e}");
            }
        }
    }

    log::info!(
        "Aggregated population for {} regions ({skipped} records skipped)",
        population.len()
    );

    population
}

/// Validates one registration record into `(state, BEV + PHEV)`.
///
/// # Errors
///
/// Returns [`MalformedRecord`] if the record does not match the schema,
/// a field is missing, a count does not parse or the sum overflows.
pub fn parse_record(record: &serde_json::Value) -> Result<(String, u64), MalformedRecord> {
    let raw = RawPopulationRecord::deserialize(record)
        .map_err(|e| MalformedRecord::Schema(e.to_string()))?;

    let state = raw
        .state
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(MalformedRecord::Missing("State"))?;
    let electric = count_value("Electric (EV)", raw.electric.as_ref())?;
    let hybrid = count_value("Plug-In Hybrid Electric (PHEV)", raw.plug_in_hybrid.as_ref())?;

    let total = electric.checked_add(hybrid).ok_or(MalformedRecord::Overflow)?;
    Ok((state, total))
}

fn count_value(field: &'static str, value: Option<&CountField>) -> Result<u64, MalformedRecord> {
    match value {
        None => Err(MalformedRecord::Missing(field)),
        Some(CountField::Number(n)) => Ok(*n),
        Some(CountField::Text(text)) => {
            parse_grouped_count(text).ok_or_else(|| MalformedRecord::NotNumeric {
                field,
                value: text.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_grouped_counts() {
        assert_eq!(parse_grouped_count("1,000"), Some(1000));
        assert_eq!(parse_grouped_count("1,234,567"), Some(1_234_567));
        assert_eq!(parse_grouped_count(" 42 "), Some(42));
        assert_eq!(parse_grouped_count(""), None);
        assert_eq!(parse_grouped_count(","), None);
        assert_eq!(parse_grouped_count("-5"), None);
        assert_eq!(parse_grouped_count("1.5"), None);
        assert_eq!(parse_grouped_count("n/a"), None);
        assert_eq!(parse_grouped_count("99,999,999,999,999,999,999"), None);
    }

    #[test]
    fn sums_electric_and_hybrid() {
        let records = vec![json!({
            "State": "Texas",
            "Electric (EV)": "1,000",
            "Plug-In Hybrid Electric (PHEV)": "500"
        })];

        let population = aggregate_population(&records);

        assert_eq!(population.get("Texas"), 1500);
        assert_eq!(population.get("Ohio"), 0);
    }

    #[test]
    fn grouped_electric_count_is_summed() {
        let records = vec![json!({
            "Electric (EV)": "1,200",
            "Plug-In Hybrid Electric (PHEV)": "300",
            "State": "Texas"
        })];

        let population = aggregate_population(&records);

        assert_eq!(population.len(), 1);
        assert_eq!(population.get("Texas"), 1500);
    }

    #[test]
    fn non_numeric_record_is_skipped() {
        let records = vec![
            json!({
                "State": "Texas",
                "Electric (EV)": "N/A",
                "Plug-In Hybrid Electric (PHEV)": "5"
            }),
            json!({ "State": "Utah", "Electric (EV)": "7", "Plug-In Hybrid Electric (PHEV)": "3" }),
        ];

        let population = aggregate_population(&records);

        assert_eq!(population.len(), 1);
        assert_eq!(population.get("Texas"), 0);
        assert_eq!(population.get("Utah"), 10);
    }

    #[test]
    fn missing_fields_are_reported() {
        assert_eq!(
            parse_record(&json!({ "Electric (EV)": "1", "Plug-In Hybrid Electric (PHEV)": "1" })),
            Err(MalformedRecord::Missing("State"))
        );
        assert_eq!(
            parse_record(&json!({ "State": "Iowa", "Electric (EV)": "1" })),
            Err(MalformedRecord::Missing("Plug-In Hybrid Electric (PHEV)"))
        );
        assert!(matches!(
            parse_record(&json!("Iowa")),
            Err(MalformedRecord::Schema(_))
        ));
    }

    #[test]
    fn numeric_json_counts_are_accepted() {
        let record = json!({
            "State": "Maine",
            "Electric (EV)": 4,
            "Plug-In Hybrid Electric (PHEV)": "1,001"
        });
        assert_eq!(parse_record(&record), Ok(("Maine".to_string(), 1005)));
    }

    #[test]
    fn overflowing_sum_is_skipped() {
        let max = u64::MAX.to_string();
        let record = json!({
            "State": "Big",
            "Electric (EV)": max,
            "Plug-In Hybrid Electric (PHEV)": "1"
        });
        assert_eq!(parse_record(&record), Err(MalformedRecord::Overflow));
    }

    #[test]
    fn last_duplicate_state_wins() {
        let records = vec![
            json!({ "State": "Texas", "Electric (EV)": "1", "Plug-In Hybrid Electric (PHEV)": "1" }),
            json!({
                "State": "Texas",
                "Electric (EV)": "10",
                "Plug-In Hybrid Electric (PHEV)": "0"
            }),
        ];

        assert_eq!(aggregate_population(&records).get("Texas"), 10);
    }
}
