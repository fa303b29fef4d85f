//! FileEntry - Metadata snapshot of a single filesystem entry

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Metadata snapshot of a file or directory, read at a decision point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path of the entry
    pub path: PathBuf,

    /// Whether the entry is a directory (symlinks are followed)
    pub is_dir: bool,

    /// File size in bytes
    pub size: u64,

    /// Last modification time
    pub mtime: SystemTime,
}

impl FileEntry {
    /// Create a file entry with the given parameters
    pub fn new(path: PathBuf, size: u64, mtime: SystemTime) -> Self {
        Self {
            path,
            is_dir: false,
            size,
            mtime,
        }
    }

    /// Create a directory entry
    pub fn directory(path: PathBuf, mtime: SystemTime) -> Self {
        Self {
            path,
            is_dir: true,
            size: 0,
            mtime,
        }
    }

    /// Read a fresh entry from the filesystem, following symlinks
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self::from_metadata(path.to_path_buf(), &metadata))
    }

    /// Build an entry from metadata already at hand
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        Self {
            path,
            is_dir: metadata.is_dir(),
            size: metadata.len(),
            mtime: metadata.modified().unwrap_or(UNIX_EPOCH),
        }
    }

    /// Base name of the entry, empty when the path has none
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Modification time in milliseconds since the Unix epoch
    ///
    /// Times before the epoch are reported as negative values.
    pub fn mtime_millis(&self) -> i128 {
        match self.mtime.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_millis() as i128,
            Err(e) => -(e.duration().as_millis() as i128),
        }
    }
}
