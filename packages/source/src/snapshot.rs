//! Local snapshots of fetched payloads.
//!
//! The last successfully fetched payload of every source is kept on disk
//! as `<dir>/<source_id>.json` so a run can be inspected (or replayed
//! through a `file` source) without hitting the network again.

use std::path::{Path, PathBuf};

/// Writes `payload` to `<dir>/<source_id>.json`, replacing any previous
/// snapshot. The file is written to a temporary sibling first and renamed
/// into place.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created or the file
/// cannot be written.
pub fn write_snapshot(dir: &Path, source_id: &str, payload: &[u8]) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(format!("{source_id}.json"));
    let tmp = dir.join(format!(".{source_id}.json.tmp"));
    std::fs::write(&tmp, payload)?;
    std::fs::rename(&tmp, &path)?;

    log::debug!("Wrote {} byte snapshot to {}", payload.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_replaces_snapshots() {
        let dir = std::env::temp_dir().join(format!("ev_map_snapshot_test_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let path = write_snapshot(&dir, "stations", b"[1]").unwrap();
        assert_eq!(path, dir.join("stations.json"));
        assert_eq!(std::fs::read(&path).unwrap(), b"[1]");

        write_snapshot(&dir, "stations", b"[1, 2]").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"[1, 2]");
        assert!(!dir.join(".stations.json.tmp").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
