use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{PersistError, Result};

/// Directory holding Parlance data for the current user
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("parlance"))
        .ok_or(PersistError::DataDirUnavailable)
}

/// Pretty JSON with object keys in sorted order
pub fn to_sorted_json(value: Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(&sort_keys(value))?)
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(key, value)| (key, sort_keys(value)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Replace `path` with `bytes` all-or-nothing: temp file in the same
/// directory, synced to disk, then renamed over the target
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let path = path.to_path_buf();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &bytes))
        .await
        .map_err(|e| PersistError::Internal(format!("write task failed: {e}")))?
}

/// Blocking variant for the small key/value files.
///
/// The temp file is synced to disk before the rename.
///
/// tempfile creates its files owner-only (0600) on Unix, and the rename
/// keeps that mode.
pub fn write_atomic_blocking(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir)?;

    let mut tmp_file = NamedTempFile::new_in(dir)?;
    tmp_file.write_all(bytes)?;
    tmp_file.as_file().sync_all()?;
    tmp_file
        .persist(path)
        .map_err(|e| PersistError::AtomicWrite {
            path: path.to_path_buf(),
            source: e.error,
        })?;
    Ok(())
}
