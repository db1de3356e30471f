//! Station detail table: whitelisted metadata flattened into columns.

use std::collections::HashSet;

use ev_map_station_models::StationTable;
use serde_json::{Map, Value};

use crate::columns::make_column_names_unique;

/// Metadata keys kept in the station detail table.
pub const METADATA_KEYS: &[&str] = &[
    "name",
    "brand",
    "amenity",
    "operator",
    "capacity",
    "addr:city",
    "addr:state",
];

/// Prefix applied to flattened metadata columns.
pub const METADATA_PREFIX: &str = "metadata_";

const METADATA_FIELD: &str = "metadata";
const NOT_AVAILABLE: &str = "not available";

/// Where a table column takes its values from.
enum ColumnSource {
    TopLevel(String),
    Metadata(String),
}

/// Builds the station detail table from raw station records.
///
/// Top-level fields become columns in the order they are first met while
/// scanning the records. Within a record, keys come in `serde_json` map
/// order, which is sorted by key. The `metadata` object is reduced to
/// `keys_to_keep` and flattened into `metadata_<key>` columns appended
/// after them. Column names are made unique case-insensitively, nulls in
/// metadata columns are backfilled and duplicate rows are dropped (first
/// occurrence wins).
///
/// Records that are not JSON objects are skipped.
#[must_use]
pub fn build_station_table(records: &[Value], keys_to_keep: &[&str]) -> StationTable {
    let objects: Vec<&Map<String, Value>> = records
        .iter()
        .filter_map(|record| {
            let object = record.as_object();
            if object.is_none() {
                log::warn!("Skipping non-object station record in detail table");
            }
            object
        })
        .collect();

    let sources = collect_columns(&objects, keys_to_keep);
    let names: Vec<String> = sources
        .iter()
        .map(|source| match source {
            ColumnSource::TopLevel(name) => name.clone(),
            ColumnSource::Metadata(key) => format!("{METADATA_PREFIX}{key}"),
        })
        .collect();
    let columns = make_column_names_unique(&names);
    let backfills = backfill_values(&columns, keys_to_keep);

    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(objects.len());

    for object in objects {
        let metadata = object.get(METADATA_FIELD).and_then(Value::as_object);
        let row: Vec<Value> = sources
            .iter()
            .zip(&backfills)
            .map(|(source, backfill)| {
                let value = match source {
                    ColumnSource::TopLevel(name) => object.get(name),
                    ColumnSource::Metadata(key) => metadata.and_then(|m| m.get(key)),
                };
                match (value, backfill) {
                    (None | Some(Value::Null), Some(fill)) => fill.clone(),
                    (Some(value), _) => value.clone(),
                    (None, None) => Value::Null,
                }
            })
            .collect();

        // serde_json renders identical values identically, so the text form
        // is a usable row identity.
        let key = Value::Array(row.clone()).to_string();
        if seen.insert(key) {
            rows.push(row);
        }
    }

    log::debug!(
        "Station detail table: {} columns, {} rows",
        columns.len(),
        rows.len()
    );

    StationTable { columns, rows }
}

fn collect_columns(objects: &[&Map<String, Value>], keys_to_keep: &[&str]) -> Vec<ColumnSource> {
    let mut top_level: Vec<String> = Vec::new();
    let mut metadata: Vec<String> = Vec::new();

    for object in objects {
        for name in object.keys() {
            if name != METADATA_FIELD && !top_level.contains(name) {
                top_level.push(name.clone());
            }
        }

        if let Some(meta) = object.get(METADATA_FIELD).and_then(Value::as_object) {
            for key in meta.keys() {
                if keys_to_keep.contains(&key.as_str()) && !metadata.contains(key) {
                    metadata.push(key.clone());
                }
            }
        }
    }

    top_level
        .into_iter()
        .map(ColumnSource::TopLevel)
        .chain(metadata.into_iter().map(ColumnSource::Metadata))
        .collect()
}

/// Null replacement per final column name, aligned with `columns`.
fn backfill_values(columns: &[String], keys_to_keep: &[&str]) -> Vec<Option<Value>> {
    let whitelisted: HashSet<String> = keys_to_keep
        .iter()
        .map(|key| format!("{METADATA_PREFIX}{key}"))
        .collect();

    columns
        .iter()
        .map(|column| match column.strip_prefix(METADATA_PREFIX) {
            Some("name") => Some(Value::from("Charging point")),
            Some("capacity") => Some(Value::from(1)),
            Some(_) if whitelisted.contains(column) => Some(Value::from(NOT_AVAILABLE)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn flattens_only_whitelisted_metadata() {
        let records = vec![json!({
            "lat": 30.0,
            "lng": -97.0,
            "metadata": { "name": "Depot", "socket:type2": 2, "operator": "City" }
        })];

        let table = build_station_table(&records, METADATA_KEYS);

        assert_eq!(
            table.columns,
            vec!["lat", "lng", "metadata_name", "metadata_operator"]
        );
        assert_eq!(table.value(0, "metadata_name"), Some(&json!("Depot")));
        assert_eq!(table.column_index("metadata_socket:type2"), None);
    }

    #[test]
    fn backfills_missing_metadata_values() {
        let records = vec![
            json!({
                "lat": 1.0,
                "lng": 1.0,
                "metadata": { "name": "A", "capacity": 4, "brand": "X" }
            }),
            json!({ "lat": 2.0, "lng": 2.0, "metadata": { "name": null } }),
            json!({ "lat": 3.0, "lng": 3.0 }),
        ];

        let table = build_station_table(&records, METADATA_KEYS);

        assert_eq!(table.len(), 3);
        assert_eq!(table.value(1, "metadata_name"), Some(&json!("Charging point")));
        assert_eq!(table.value(1, "metadata_capacity"), Some(&json!(1)));
        assert_eq!(table.value(1, "metadata_brand"), Some(&json!("not available")));
        assert_eq!(table.value(2, "metadata_brand"), Some(&json!("not available")));
        assert_eq!(table.value(0, "metadata_capacity"), Some(&json!(4)));
    }

    #[test]
    fn top_level_nulls_are_kept() {
        let records = vec![json!({ "lat": 1.0, "lng": 1.0 }), json!({ "lat": 2.0 })];

        let table = build_station_table(&records, METADATA_KEYS);

        assert_eq!(table.value(1, "lng"), Some(&Value::Null));
    }

    #[test]
    fn drops_duplicate_rows() {
        let record = json!({ "lat": 1.0, "lng": 1.0, "metadata": { "name": "A" } });
        let records = vec![record.clone(), json!({ "lat": 5.0, "lng": 5.0 }), record];

        let table = build_station_table(&records, METADATA_KEYS);

        assert_eq!(table.len(), 2);
        assert_eq!(table.value(1, "lat"), Some(&json!(5.0)));
    }

    #[test]
    fn rows_equal_after_backfill_are_duplicates() {
        let records = vec![
            json!({ "lat": 1.0, "lng": 1.0, "metadata": { "name": null } }),
            json!({ "lat": 1.0, "lng": 1.0, "metadata": { "name": "Charging point" } }),
        ];

        assert_eq!(build_station_table(&records, METADATA_KEYS).len(), 1);
    }

    #[test]
    fn clashing_column_names_are_made_unique() {
        let records = vec![json!({
            "lat": 1.0,
            "lng": 1.0,
            "metadata_name": "top level",
            "metadata": { "name": "nested" }
        })];

        let table = build_station_table(&records, METADATA_KEYS);

        assert_eq!(
            table.columns,
            vec!["lat", "lng", "metadata_name", "metadata_name_1"]
        );
        assert_eq!(table.value(0, "metadata_name"), Some(&json!("top level")));
        assert_eq!(table.value(0, "metadata_name_1"), Some(&json!("nested")));
    }

    #[test]
    fn keys_differing_only_by_case_get_distinct_columns() {
        let records = vec![json!({ "lat": 1, "lng": 1, "Name": "A", "name": "a", "": "x" })];

        let table = build_station_table(&records, &[]);

        let mut columns = table.columns.clone();
        columns.sort();
        assert_eq!(columns, vec!["Name", "column", "lat", "lng", "name_1"]);
        assert_eq!(table.value(0, "Name"), Some(&json!("A")));
        assert_eq!(table.value(0, "name_1"), Some(&json!("a")));
        assert_eq!(table.value(0, "column"), Some(&json!("x")));
    }

    #[test]
    fn skips_non_object_records() {
        let records = vec![json!(42), json!({ "lat": 1.0, "lng": 1.0 })];
        assert_eq!(build_station_table(&records, METADATA_KEYS).len(), 1);
    }

    #[test]
    fn empty_input_gives_empty_table() {
        let table = build_station_table(&[], METADATA_KEYS);
        assert!(table.columns.is_empty());
        assert!(table.is_empty());
    }
}
