//! The output `DuckDB`: the `charging_stations` aggregate, the optional
//! `station_details` table and a `_meta` table describing the last run.

use std::path::Path;

use chrono::{DateTime, Utc};
use duckdb::Connection;
use ev_map_database_models::{AggregateRow, RunOutput};
use ev_map_station_models::StationTable;

use crate::DbError;

/// Aggregate table name.
pub const AGGREGATE_TABLE: &str = "charging_stations";

/// Station detail table name.
pub const STATION_DETAILS_TABLE: &str = "station_details";

/// Opens (or creates) the output `DuckDB` and ensures the `_meta` table
/// exists.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        crate::paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Opens a throwaway in-memory output database.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _meta (
            key TEXT PRIMARY KEY,
            value TEXT
        );",
    )?;
    Ok(())
}

/// Replaces the aggregate (and station detail) tables with `output` in a
/// single transaction and records `last_run_at` and `row_count` in `_meta`.
///
/// When `output.station_details` is `None` any previous detail table is
/// dropped so the database never mixes runs.
///
/// Returns the number of aggregate rows written.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails or a count does not fit the
/// `INTEGER` columns. The transaction is rolled back and the previous
/// contents stay in place.
pub fn replace_output(
    conn: &Connection,
    output: &RunOutput,
    run_at: DateTime<Utc>,
) -> Result<u64, DbError> {
    conn.execute_batch("BEGIN TRANSACTION")?;

    match write_output(conn, output, run_at) {
        Ok(written) => {
            conn.execute_batch("COMMIT")?;
            Ok(written)
        }
        Err(e) => {
            if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                log::error!("Rollback failed: {rollback}");
            }
            Err(e)
        }
    }
}

fn write_output(
    conn: &Connection,
    output: &RunOutput,
    run_at: DateTime<Utc>,
) -> Result<u64, DbError> {
    conn.execute_batch(&format!(
        "DROP TABLE IF EXISTS {AGGREGATE_TABLE};
         CREATE TABLE {AGGREGATE_TABLE} (
            state_name TEXT NOT NULL PRIMARY KEY,
            count_of_ev_charging_stations INTEGER NOT NULL,
            count_of_ev_vehicles INTEGER NOT NULL
         );"
    ))?;

    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {AGGREGATE_TABLE}
            (state_name, count_of_ev_charging_stations, count_of_ev_vehicles)
         VALUES (?, ?, ?)"
    ))?;

    let mut written = 0u64;
    for row in &output.rows {
        let stations = to_integer(row.station_count, &row.region_name)?;
        let vehicles = to_integer(row.vehicle_count, &row.region_name)?;
        stmt.execute(duckdb::params![row.region_name, stations, vehicles])?;
        written += 1;
    }

    conn.execute_batch(&format!("DROP TABLE IF EXISTS {STATION_DETAILS_TABLE};"))?;
    if let Some(details) = &output.station_details {
        write_station_details(conn, details)?;
    }

    set_meta(conn, "last_run_at", &run_at.to_rfc3339())?;
    set_meta(conn, "row_count", &written.to_string())?;

    Ok(written)
}

fn to_integer(value: u64, region: &str) -> Result<i32, DbError> {
    i32::try_from(value).map_err(|_| DbError::Conversion {
        message: format!("count {value} for {region:?} does not fit in INTEGER"),
    })
}

fn write_station_details(conn: &Connection, details: &StationTable) -> Result<(), DbError> {
    if details.columns.is_empty() {
        log::warn!("Station detail table has no columns, not writing {STATION_DETAILS_TABLE}");
        return Ok(());
    }

    let columns: Vec<String> = details.columns.iter().map(|c| quote_ident(c)).collect();
    let definitions: Vec<String> = columns.iter().map(|c| format!("{c} TEXT")).collect();
    conn.execute_batch(&format!(
        "CREATE TABLE {STATION_DETAILS_TABLE} ({});",
        definitions.join(", ")
    ))?;

    let placeholders = vec!["?"; columns.len()].join(", ");
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {STATION_DETAILS_TABLE} ({}) VALUES ({placeholders})",
        columns.join(", ")
    ))?;

    for row in &details.rows {
        let values: Vec<Option<String>> = row.iter().map(cell_text).collect();
        stmt.execute(duckdb::params_from_iter(values))?;
    }

    log::debug!(
        "Wrote {} station detail rows ({} columns)",
        details.rows.len(),
        columns.len()
    );
    Ok(())
}

/// Quotes an identifier, doubling any embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn cell_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Gets a metadata value from the `_meta` table.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>, DbError> {
    let mut stmt = conn.prepare("SELECT value FROM _meta WHERE key = ?")?;
    let result = stmt.query_row([key], |row| row.get(0));
    match result {
        Ok(v) => Ok(Some(v)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

/// Sets a metadata value in the `_meta` table.
///
/// # Errors
///
/// Returns [`DbError`] if the upsert fails.
pub fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO _meta (key, value) VALUES (?, ?)
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        duckdb::params![key, value],
    )?;
    Ok(())
}

/// Returns `true` if `table` exists in the main schema.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, DbError> {
    let mut stmt = conn.prepare(
        "SELECT COUNT(*) FROM information_schema.tables
         WHERE table_schema = 'main' AND table_name = ?",
    )?;
    let count: i64 = stmt.query_row([table], |row| row.get(0))?;
    Ok(count > 0)
}

/// Reads the persisted aggregate, ordered by region name. Returns an
/// empty list if no run has been persisted yet.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a stored count is negative.
pub fn read_aggregate(conn: &Connection) -> Result<Vec<AggregateRow>, DbError> {
    if !table_exists(conn, AGGREGATE_TABLE)? {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT state_name, count_of_ev_charging_stations, count_of_ev_vehicles
         FROM {AGGREGATE_TABLE}
         ORDER BY state_name"
    ))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i32>(1)?,
                row.get::<_, i32>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(region_name, stations, vehicles)| {
            let convert = |value: i32| {
                u64::try_from(value).map_err(|_| DbError::Conversion {
                    message: format!("negative count {value} for {region_name:?}"),
                })
            };
            Ok(AggregateRow {
                station_count: convert(stations)?,
                vehicle_count: convert(vehicles)?,
                region_name,
            })
        })
        .collect()
}
