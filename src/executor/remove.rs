//! Recursive removal of destination entries

use crate::types::SyncError;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Delete a file, symlink or directory tree
///
/// Directories are removed post-order (children before the directory
/// itself). Symlinks are removed as links and never followed. An entry that
/// is already gone counts as removed.
pub fn remove_entry(path: &Path) -> Result<(), SyncError> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
