//! Error types for tandem

use std::path::PathBuf;
use thiserror::Error;

/// Error types for tandem operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error (origin/destination checks)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entry handed to the path mapper does not live under the expected root
    #[error("{entry} is not located under {root}")]
    OutsideRoot { root: PathBuf, entry: PathBuf },

    /// Change notifications cannot be registered for the origin
    #[error("Cannot monitor changes in {path}: {reason}")]
    WatchUnavailable { path: PathBuf, reason: String },

    /// A running replicator reached its terminal state
    #[error("Continuous sync stopped for {0}")]
    ReplicationStopped(String),
}

impl SyncError {
    /// Check if this error ends the task it was raised for
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Config(_)
                | SyncError::Validation(_)
                | SyncError::WatchUnavailable { .. }
                | SyncError::ReplicationStopped(_)
        )
    }

    /// Check if this error is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(self, SyncError::Validation(_) | SyncError::Config(_))
    }

    /// Check if this error is related to permissions
    pub fn is_permission_error(&self) -> bool {
        matches!(self, SyncError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied)
    }
}
