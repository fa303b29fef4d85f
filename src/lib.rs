//! # tandem - One-way continuous directory mirroring
//!
//! Each configured task pairs an origin folder with a destination folder.
//! A task first reconciles the destination with the origin (prune, then
//! copy/update), then replicates every change notified for the origin root
//! until it is stopped.

// Module declarations
pub mod commands;
pub mod config;
pub mod diff;
pub mod executor;
pub mod filter;
pub mod logging;
pub mod reconcile;
pub mod task;
pub mod types;
pub mod watch;

// Re-export commonly used types
pub use config::{RunConfig, SyncContext, Task};
pub use filter::EntryFilter;
pub use reconcile::{ReconcileStats, Reconciler};
pub use task::{SyncTask, TaskHandle};
pub use types::{FileEntry, SyncAction, SyncError};
pub use watch::{ChangeReplicator, ReplicatorState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
