//! Relative-path substitution between two roots

use crate::types::SyncError;
use std::path::{Path, PathBuf};

/// Map an entry under `root_a` to the corresponding path under `root_b`
///
/// Pure path arithmetic, no I/O: the part of `entry` below `root_a` is
/// appended to `root_b`. Mapping the root itself yields `root_b`.
///
/// # Errors
/// * `SyncError::OutsideRoot` - `entry` is not located under `root_a`
pub fn equivalent_path(root_a: &Path, root_b: &Path, entry: &Path) -> Result<PathBuf, SyncError> {
    let relative = entry
        .strip_prefix(root_a)
        .map_err(|_| SyncError::OutsideRoot {
            root: root_a.to_path_buf(),
            entry: entry.to_path_buf(),
        })?;

    if relative.as_os_str().is_empty() {
        return Ok(root_b.to_path_buf());
    }
    Ok(root_b.join(relative))
}
