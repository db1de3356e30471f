//! Canonical file paths for the data directory.
//!
//! All paths are relative to the project root's `data/` directory.

use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
#[must_use]
pub fn project_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .unwrap_or(manifest_dir)
        .to_path_buf()
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the default output `DuckDB` path.
#[must_use]
pub fn output_db_path() -> PathBuf {
    data_dir().join("charging_station.duckdb")
}

/// Returns the `data/raw/` directory for fetched payload snapshots.
#[must_use]
pub fn raw_snapshot_dir() -> PathBuf {
    data_dir().join("raw")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_paths_live_under_data_dir() {
        let data = data_dir();
        assert!(output_db_path().starts_with(&data));
        assert!(raw_snapshot_dir().starts_with(&data));
        assert_eq!(
            output_db_path().file_name().and_then(|n| n.to_str()),
            Some("charging_station.duckdb")
        );
    }

    #[test]
    fn ensure_dir_is_idempotent() {
        let dir = std::env::temp_dir().join("ev_map_ensure_dir_test/nested");
        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }
}
