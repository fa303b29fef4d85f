//! SyncAction - Filesystem mutations decided by the reconciler and the replicator

use std::path::{Path, PathBuf};

/// A single mutation of the destination tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Copy a file over its destination equivalent (new or changed)
    Copy { from: PathBuf, to: PathBuf },

    /// Create a directory, including missing parents
    CreateDir(PathBuf),

    /// Delete a destination entry (recursively for directories)
    Delete(PathBuf),
}

impl SyncAction {
    /// Short label used in log lines and summaries
    pub fn action_name(&self) -> &'static str {
        match self {
            SyncAction::Copy { .. } => "Copy",
            SyncAction::CreateDir(_) => "Mkdir",
            SyncAction::Delete(_) => "Delete",
        }
    }

    /// Destination path touched by the action
    pub fn target(&self) -> &Path {
        match self {
            SyncAction::Copy { to, .. } => to,
            SyncAction::CreateDir(path) | SyncAction::Delete(path) => path,
        }
    }
}
