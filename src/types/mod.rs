//! Core type definitions for tandem

mod action;
mod entry;
mod error;

pub use action::SyncAction;
pub use entry::FileEntry;
pub use error::SyncError;
