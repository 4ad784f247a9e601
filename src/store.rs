//! Whole-collection JSON persistence.
//!
//! Task and account collections are stored as bare JSON arrays and
//! rewritten in full after every mutation. Writes go to a temporary
//! sibling file which is then renamed over the target.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use crate::error::{AutomationError, Result};

/// Read a collection. A missing file is an empty collection.
///
/// # Errors
///
/// Returns [`AutomationError::Store`] when the file exists but cannot be
/// read or does not contain a JSON array of `T`.
pub fn load_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let bytes = match std::fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(AutomationError::Store(format!(
                "cannot read {}: {e}",
                path.display()
            )));
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| AutomationError::Store(format!("cannot parse {}: {e}", path.display())))
}

/// Replace the collection on disk with `items`.
///
/// # Errors
///
/// Returns [`AutomationError::Store`] when the directory, temp file or
/// rename cannot be completed.
pub fn save_collection<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| AutomationError::Store(format!("cannot create store dir: {e}")))?;
    }

    let json = serde_json::to_string_pretty(items)
        .map_err(|e| AutomationError::Store(format!("cannot serialize collection: {e}")))?;

    let tmp_path = temp_sibling(path);
    std::fs::write(&tmp_path, json)
        .map_err(|e| AutomationError::Store(format!("cannot write {}: {e}", tmp_path.display())))?;
    std::fs::rename(&tmp_path, path)
        .map_err(|e| AutomationError::Store(format!("cannot replace {}: {e}", path.display())))?;

    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let tmp_name = format!(
        ".{}.tmp-{}",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("collection"),
        std::process::id()
    );
    path.parent()
        .map(|p| p.join(&tmp_name))
        .unwrap_or_else(|| PathBuf::from(&tmp_name))
}
