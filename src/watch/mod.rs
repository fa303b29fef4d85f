//! Change replicator - replicates origin change notifications one by one
//!
//! Only the origin root is registered with the OS. Entries inside
//! subdirectories created after startup are covered by the next full
//! reconciliation, not by this loop. Dropped notifications (overflow) are
//! not recovered here either; run `tandem --once` periodically if the
//! origin sees bursts of changes.

pub mod event;

use crate::config::SyncContext;
use crate::diff::equivalent_path;
use crate::executor;
use crate::filter::EntryFilter;
use crate::types::{FileEntry, SyncAction, SyncError};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::watch;

pub use event::{changes_from, ChangeEvent, ChangeKind};

/// Lifecycle of a replicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicatorState {
    /// Registered with the OS, loop not started yet
    Initializing,
    /// Waiting for or replicating notifications
    Running,
    /// Terminal: continuous sync is no longer provided
    Stopped,
}

enum Message {
    Notify(notify::Result<notify::Event>),
    Stop,
}

/// Replicates changes of one origin root into its destination
pub struct ChangeReplicator {
    origin: PathBuf,
    destination: PathBuf,
    filter: Arc<EntryFilter>,
    ctx: SyncContext,
    // Kept alive for as long as the loop runs
    _watcher: RecommendedWatcher,
    tx: Sender<Message>,
    rx: Receiver<Message>,
    stop_requested: Arc<AtomicBool>,
    state_tx: watch::Sender<ReplicatorState>,
}

impl std::fmt::Debug for ChangeReplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeReplicator")
            .field("origin", &self.origin)
            .field("destination", &self.destination)
            .field("state", &*self.state_tx.borrow())
            .finish()
    }
}

impl ChangeReplicator {
    /// Register for create/modify/delete notifications on `origin`
    ///
    /// # Errors
    /// * `SyncError::WatchUnavailable` - the OS refused the registration
    pub fn new(
        origin: PathBuf,
        destination: PathBuf,
        filter: Arc<EntryFilter>,
        ctx: SyncContext,
    ) -> Result<Self, SyncError> {
        let (tx, rx) = mpsc::channel();
        let event_tx = tx.clone();
        let unavailable = |e: notify::Error| SyncError::WatchUnavailable {
            path: origin.clone(),
            reason: e.to_string(),
        };

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = event_tx.send(Message::Notify(res));
        })
        .map_err(unavailable)?;
        watcher
            .watch(&origin, RecursiveMode::NonRecursive)
            .map_err(unavailable)?;

        let (state_tx, _) = watch::channel(ReplicatorState::Initializing);

        Ok(Self {
            origin,
            destination,
            filter,
            ctx,
            _watcher: watcher,
            tx,
            rx,
            stop_requested: Arc::new(AtomicBool::new(false)),
            state_tx,
        })
    }

    pub fn state(&self) -> ReplicatorState {
        *self.state_tx.borrow()
    }

    /// Run the loop on a dedicated worker thread
    pub fn start(self) -> Result<ReplicatorHandle, SyncError> {
        let handle = ReplicatorHandle {
            stop_tx: self.tx.clone(),
            stop_requested: Arc::clone(&self.stop_requested),
            state_rx: self.state_tx.subscribe(),
            join: None,
        };

        let join = thread::Builder::new()
            .name("tandem-watch".to_string())
            .spawn(move || self.run())?;

        Ok(ReplicatorHandle {
            join: Some(join),
            ..handle
        })
    }

    fn run(self) {
        let _span = self.ctx.span().entered();
        self.state_tx.send_replace(ReplicatorState::Running);
        tracing::info!(origin = %self.origin.display(), "monitoring changes");

        loop {
            // Sole suspension point: block until something arrives
            let Ok(first) = self.rx.recv() else { break };
            let batch: Vec<Message> = std::iter::once(first).chain(self.rx.try_iter()).collect();

            if !self.process_batch(batch) {
                tracing::info!("stop requested: monitoring ended");
                break;
            }

            if let Err(err) = self.rearm() {
                tracing::error!(
                    origin = %self.origin.display(),
                    error = %err,
                    "origin is no longer accessible: monitoring ended"
                );
                break;
            }
        }

        self.state_tx.send_replace(ReplicatorState::Stopped);
    }

    /// Replicate a batch in delivery order; false once a stop is requested
    fn process_batch(&self, batch: Vec<Message>) -> bool {
        for message in batch {
            if self.stop_requested.load(Ordering::SeqCst) {
                return false;
            }
            match message {
                Message::Stop => return false,
                Message::Notify(Err(err)) => {
                    tracing::warn!(error = %err, "watcher error");
                }
                Message::Notify(Ok(event)) => {
                    for change in changes_from(event) {
                        self.replicate(&change);
                    }
                }
            }
        }
        true
    }

    /// Apply one change to the destination
    pub fn replicate(&self, change: &ChangeEvent) {
        if change.kind == ChangeKind::Overflow {
            tracing::warn!(
                "change notifications were dropped; run a full reconciliation (tandem --once) to catch up"
            );
            return;
        }
        // Events about the root itself are handled by rearm
        if change.path == self.origin {
            return;
        }

        let equivalent = match equivalent_path(&self.origin, &self.destination, &change.path) {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring notification");
                return;
            }
        };

        match change.kind {
            ChangeKind::Created | ChangeKind::Modified => self.replicate_change(&change.path, equivalent),
            ChangeKind::Deleted => self.replicate_removal(&change.path, equivalent),
            ChangeKind::Overflow => {}
        }
    }

    fn replicate_change(&self, path: &Path, equivalent: PathBuf) {
        let entry = match FileEntry::from_path(path) {
            Ok(entry) => entry,
            Err(_) => {
                self.ctx.decision(path, "changed in origin but already gone");
                return;
            }
        };
        if !self.filter.accepts(&entry) {
            self.ctx.decision(path, "changed in origin: not accepted");
            return;
        }

        let action = if entry.is_dir {
            SyncAction::CreateDir(equivalent)
        } else {
            SyncAction::Copy {
                from: path.to_path_buf(),
                to: equivalent,
            }
        };

        match executor::apply(&action, &self.ctx) {
            Ok(_) => tracing::info!(path = %path.display(), "changed in origin: copied to destination"),
            Err(err) => tracing::warn!(
                path = %path.display(),
                to = %action.target().display(),
                error = %err,
                "changed in origin: copy failed"
            ),
        }
    }

    /// The origin entry is gone, so the filter judges its destination copy
    fn replicate_removal(&self, path: &Path, equivalent: PathBuf) {
        let entry = match FileEntry::from_path(&equivalent) {
            Ok(entry) => FileEntry {
                path: path.to_path_buf(),
                ..entry
            },
            Err(_) => {
                self.ctx.decision(path, "deleted in origin: nothing to delete in destination");
                return;
            }
        };
        if !self.filter.accepts(&entry) {
            self.ctx.decision(path, "deleted in origin: not accepted");
            return;
        }

        match executor::apply(&SyncAction::Delete(equivalent), &self.ctx) {
            Ok(_) => tracing::info!(path = %path.display(), "deleted in origin: deleted in destination"),
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "deleted in origin: delete failed"),
        }
    }

    /// The watch stays valid only while the origin root is a readable directory
    fn rearm(&self) -> Result<(), SyncError> {
        fs::read_dir(&self.origin)?;
        Ok(())
    }
}

/// Control handle of a running replicator
#[derive(Debug)]
pub struct ReplicatorHandle {
    stop_tx: Sender<Message>,
    stop_requested: Arc<AtomicBool>,
    state_rx: watch::Receiver<ReplicatorState>,
    join: Option<JoinHandle<()>>,
}

impl ReplicatorHandle {
    /// Current lifecycle state
    pub fn state(&self) -> ReplicatorState {
        *self.state_rx.borrow()
    }

    /// Whether continuous synchronization is still provided
    pub fn is_active(&self) -> bool {
        self.state() != ReplicatorState::Stopped
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<ReplicatorState> {
        self.state_rx.clone()
    }

    /// Interrupt the loop; the event being replicated is finished, the rest
    /// of its batch is discarded
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        let _ = self.stop_tx.send(Message::Stop);
    }

    /// Wait for the worker thread to end
    pub fn join(mut self) -> ReplicatorState {
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!("replicator thread panicked");
            }
        }
        ReplicatorState::Stopped
    }
}
