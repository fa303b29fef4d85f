//! Sync task - one validated origin/destination pair

use crate::config::{SyncContext, Task};
use crate::filter::EntryFilter;
use crate::reconcile::{ReconcileStats, Reconciler};
use crate::types::SyncError;
use crate::watch::{ChangeReplicator, ReplicatorHandle, ReplicatorState};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Validated pair ready to be reconciled and monitored
#[derive(Debug)]
pub struct SyncTask {
    origin: PathBuf,
    destination: PathBuf,
    filter: Arc<EntryFilter>,
    ctx: SyncContext,
    // None until registration is attempted
    replicator: Option<Result<ChangeReplicator, SyncError>>,
}

impl SyncTask {
    /// Validate both roots and register the change replicator
    ///
    /// A missing destination is created. Failing to register change
    /// notifications does not fail construction; `start()` reports it.
    ///
    /// # Errors
    /// * `SyncError::Validation` - origin or destination is unusable
    pub fn new(task: &Task, ctx: SyncContext) -> Result<Self, SyncError> {
        let mut sync = Self::single_pass(task, ctx)?;
        sync.replicator = Some(sync.register());
        Ok(sync)
    }

    /// Validate both roots without registering for change notifications
    ///
    /// Meant for single reconciliation passes. `start()` still registers
    /// the replicator on demand.
    pub fn single_pass(task: &Task, ctx: SyncContext) -> Result<Self, SyncError> {
        let _span = ctx.span().entered();
        let origin = check_origin(&task.origin)?;
        let destination = check_destination(&task.destination)?;

        if destination.starts_with(&origin) || origin.starts_with(&destination) {
            return Err(SyncError::Validation(format!(
                "{} and {} are nested: can not continue",
                origin.display(),
                destination.display()
            )));
        }

        tracing::info!(
            origin = %origin.display(),
            destination = %destination.display(),
            "task ready"
        );

        Ok(Self {
            origin,
            destination,
            filter: Arc::new(EntryFilter::from_task(task)),
            ctx,
            replicator: None,
        })
    }

    fn register(&self) -> Result<ChangeReplicator, SyncError> {
        let _span = self.ctx.span().entered();
        let replicator = ChangeReplicator::new(
            self.origin.clone(),
            self.destination.clone(),
            Arc::clone(&self.filter),
            self.ctx.clone(),
        );
        if let Err(err) = &replicator {
            tracing::error!(error = %err, "change notifications unavailable");
        }
        replicator
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Whether a change replicator is registered for this pair
    pub fn has_replicator(&self) -> bool {
        matches!(self.replicator, Some(Ok(_)))
    }

    /// Run a single full reconciliation pass
    pub fn reconcile_once(&self) -> ReconcileStats {
        Reconciler::new(
            self.origin.clone(),
            self.destination.clone(),
            Arc::clone(&self.filter),
            self.ctx.clone(),
        )
        .run()
    }

    /// Reconcile once, then replicate changes on a background worker
    ///
    /// # Errors
    /// * `SyncError::WatchUnavailable` - no replicator could be registered;
    ///   the reconciliation pass has still run
    pub fn start(mut self) -> Result<TaskHandle, SyncError> {
        tracing::info!(
            destination = %self.destination.display(),
            "updating destination with changes made since last run"
        );
        let initial = self.reconcile_once();

        let registered = self.replicator.take();
        let replicator = registered.unwrap_or_else(|| self.register())?;
        let handle = replicator.start()?;

        Ok(TaskHandle {
            label: self.ctx.label,
            initial,
            replicator: handle,
        })
    }
}

/// A started task: result of its first pass plus its running replicator
#[derive(Debug)]
pub struct TaskHandle {
    label: String,
    initial: ReconcileStats,
    replicator: ReplicatorHandle,
}

impl TaskHandle {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Statistics of the reconciliation pass run by `start()`
    pub fn initial_pass(&self) -> &ReconcileStats {
        &self.initial
    }

    pub fn state(&self) -> ReplicatorState {
        self.replicator.state()
    }

    /// Whether continuous synchronization is active for this pair
    pub fn is_active(&self) -> bool {
        self.replicator.is_active()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<ReplicatorState> {
        self.replicator.subscribe()
    }

    pub fn stop(&self) {
        self.replicator.stop();
    }

    /// Wait for the replicator to end
    pub fn join(self) -> ReplicatorState {
        self.replicator.join()
    }
}

fn check_origin(origin: &Path) -> Result<PathBuf, SyncError> {
    if !origin.exists() {
        return Err(fatal(origin, "does not exist"));
    }
    if !origin.is_dir() {
        return Err(fatal(origin, "is not a directory"));
    }
    if fs::read_dir(origin).is_err() {
        return Err(fatal(origin, "can not be read"));
    }
    Ok(fs::canonicalize(origin)?)
}

fn check_destination(destination: &Path) -> Result<PathBuf, SyncError> {
    if destination.exists() && !destination.is_dir() {
        return Err(fatal(destination, "is not a directory"));
    }
    if !destination.exists() && fs::create_dir_all(destination).is_err() {
        return Err(SyncError::Validation(format!(
            "Unable to create '{}': can not continue",
            destination.display()
        )));
    }
    if fs::read_dir(destination).is_err() {
        return Err(fatal(destination, "can not be read"));
    }

    let destination = fs::canonicalize(destination)?;
    if let Some(parent) = destination.parent() {
        if !is_writable(parent) {
            return Err(fatal(&destination, "is read-only (can not write)"));
        }
    }
    Ok(destination)
}

/// Whether this process can create entries in `dir`
///
/// Permission bits alone do not answer this (ownership, ACLs, read-only
/// mounts), so a scratch file is created and removed again.
fn is_writable(dir: &Path) -> bool {
    tempfile::Builder::new()
        .prefix(".tandem-")
        .tempfile_in(dir)
        .is_ok()
}

fn fatal(path: &Path, reason: &str) -> SyncError {
    SyncError::Validation(format!("{} {reason}: can not continue", path.display()))
}
