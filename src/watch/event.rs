//! Translation of notify events into replication work

use notify::event::{ModifyKind, RenameMode};
use notify::EventKind;
use std::path::PathBuf;

/// What happened to an origin entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    /// Some notifications were dropped by the OS
    Overflow,
}

/// One change to replicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: PathBuf) -> Self {
        Self { kind, path }
    }
}

/// Convert a notify event into zero or more change events
///
/// Renames reported as separate `From`/`To` halves become a deletion and a
/// creation. The paired `Both` form is dropped because backends that send it
/// also send the halves. A rename of unknown direction is classified by
/// whether the path still exists.
pub fn changes_from(event: notify::Event) -> Vec<ChangeEvent> {
    if event.need_rescan() {
        return vec![ChangeEvent::new(ChangeKind::Overflow, PathBuf::new())];
    }

    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Remove(_) => ChangeKind::Deleted,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => ChangeKind::Deleted,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Created,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => return Vec::new(),
        EventKind::Modify(ModifyKind::Name(_)) => {
            return event
                .paths
                .into_iter()
                .map(|p| {
                    let kind = if p.symlink_metadata().is_ok() {
                        ChangeKind::Created
                    } else {
                        ChangeKind::Deleted
                    };
                    ChangeEvent::new(kind, p)
                })
                .collect();
        }
        EventKind::Modify(_) => ChangeKind::Modified,
        _ => return Vec::new(),
    };

    event
        .paths
        .into_iter()
        .map(|p| ChangeEvent::new(kind, p))
        .collect()
}
