//! Executor module for destination mutations

pub mod copy;
pub mod remove;

use crate::config::SyncContext;
use crate::types::{SyncAction, SyncError};
use std::fs;

pub use copy::copy_file;
pub use remove::remove_entry;

/// Apply one action to the destination tree
///
/// In dry-run mode nothing is touched and the call reports success with
/// zero bytes copied, so callers run exactly the same decision path.
///
/// # Returns
/// * `Ok(u64)` - Bytes copied (0 for mkdir and delete)
/// * `Err(SyncError)` - The mutation failed; nothing else was attempted
pub fn apply(action: &SyncAction, ctx: &SyncContext) -> Result<u64, SyncError> {
    if ctx.dry_run {
        tracing::info!(
            action = action.action_name(),
            path = %action.target().display(),
            "dry-run: skipped"
        );
        return Ok(0);
    }

    match action {
        SyncAction::Copy { from, to } => copy_file(from, to),
        SyncAction::CreateDir(path) => {
            fs::create_dir_all(path)?;
            Ok(0)
        }
        SyncAction::Delete(path) => {
            remove_entry(path)?;
            Ok(0)
        }
    }
}
