//! Full reconciliation pass (prune, then copy/update)

use crate::config::SyncContext;
use crate::diff::{are_equivalent, equivalent_path};
use crate::executor;
use crate::filter::EntryFilter;
use crate::types::{SyncAction, SyncError};
use ignore::WalkBuilder;
use indicatif::HumanBytes;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Deepest directory level visited by either phase
pub const MAX_DEPTH: usize = 256;

/// Actions taken by one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Files copied because the destination was missing or different
    pub copied: usize,
    /// Destination entries removed because origin no longer has them
    pub deleted: usize,
    /// Destination directories created
    pub dirs_created: usize,
    /// Files already equivalent
    pub unchanged: usize,
    /// Origin entries rejected by the filter
    pub rejected: usize,
    /// Operations that failed and were skipped
    pub failed: usize,
    /// Aggregate copied bytes
    pub bytes_copied: u64,
}

impl ReconcileStats {
    /// Number of destination mutations performed (or planned in dry-run)
    pub fn mutations(&self) -> usize {
        self.copied + self.deleted + self.dirs_created
    }
}

/// One-shot prune-then-copy pass over an origin/destination pair
#[derive(Debug, Clone)]
pub struct Reconciler {
    origin: PathBuf,
    destination: PathBuf,
    filter: Arc<EntryFilter>,
    ctx: SyncContext,
}

impl Reconciler {
    pub fn new(
        origin: PathBuf,
        destination: PathBuf,
        filter: Arc<EntryFilter>,
        ctx: SyncContext,
    ) -> Self {
        Self {
            origin,
            destination,
            filter,
            ctx,
        }
    }

    /// Bring the destination into agreement with the origin
    ///
    /// Runs both phases unconditionally. Individual failures are logged and
    /// counted; they never abort the pass.
    pub fn run(&self) -> ReconcileStats {
        let _span = self.ctx.span().entered();
        let started = Instant::now();
        let mut stats = ReconcileStats::default();

        tracing::info!(destination = %self.destination.display(), "removing entries missing from origin");
        self.prune(&mut stats);

        tracing::info!(origin = %self.origin.display(), "copying new and changed entries");
        self.copy(&mut stats);

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "{}",
            format_summary(&stats)
        );
        stats
    }

    /// Phase 1: delete destination entries whose origin equivalent is gone
    ///
    /// The filter is not consulted here.
    fn prune(&self, stats: &mut ReconcileStats) {
        let walker = WalkBuilder::new(&self.destination)
            .standard_filters(false)
            .follow_links(false)
            .max_depth(Some(MAX_DEPTH))
            .build();

        let mut removed: Vec<PathBuf> = Vec::new();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "cannot enumerate destination entry");
                    stats.failed += 1;
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }

            let path = entry.path();
            if removed.iter().any(|r| path.starts_with(r)) {
                continue;
            }

            let equivalent = match equivalent_path(&self.destination, &self.origin, path) {
                Ok(p) => p,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping entry");
                    stats.failed += 1;
                    continue;
                }
            };

            if fs::symlink_metadata(&equivalent).is_ok() {
                continue;
            }

            match executor::apply(&SyncAction::Delete(path.to_path_buf()), &self.ctx) {
                Ok(_) => {
                    tracing::info!(path = %path.display(), "no longer in origin: deleted");
                    stats.deleted += 1;
                    removed.push(path.to_path_buf());
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "cannot delete");
                    stats.failed += 1;
                }
            }
        }
    }

    /// Phase 2: create missing directories and copy files that differ
    fn copy(&self, stats: &mut ReconcileStats) {
        let rejected = Arc::new(AtomicUsize::new(0));
        let walker = {
            let filter = Arc::clone(&self.filter);
            let rejected = Arc::clone(&rejected);
            let ctx = self.ctx.clone();
            WalkBuilder::new(&self.origin)
                .standard_filters(false)
                .follow_links(true)
                .max_depth(Some(MAX_DEPTH))
                .filter_entry(move |entry| {
                    let accepted = filter.accepts_path(entry.path());
                    if !accepted {
                        rejected.fetch_add(1, Ordering::Relaxed);
                        ctx.decision(entry.path(), "not accepted");
                    }
                    accepted
                })
                .build()
        };

        // Subtrees whose destination directory could not be created
        let mut blocked: Vec<PathBuf> = Vec::new();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "cannot enumerate origin entry");
                    stats.failed += 1;
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }

            let path = entry.path();
            if blocked.iter().any(|b| path.starts_with(b)) {
                continue;
            }

            let equivalent = match equivalent_path(&self.origin, &self.destination, path) {
                Ok(p) => p,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping entry");
                    stats.failed += 1;
                    continue;
                }
            };

            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            let outcome = if is_dir {
                self.sync_directory(&equivalent, stats)
            } else {
                self.sync_file(path, &equivalent, stats)
            };

            if let Err(err) = outcome {
                stats.failed += 1;
                if is_dir {
                    tracing::error!(
                        path = %equivalent.display(),
                        error = %err,
                        "cannot create folder: its origin content will not be synchronized"
                    );
                    blocked.push(path.to_path_buf());
                } else {
                    tracing::warn!(
                        from = %path.display(),
                        to = %equivalent.display(),
                        error = %err,
                        "copy failed"
                    );
                }
            }
        }

        stats.rejected += rejected.load(Ordering::Relaxed);
    }

    fn sync_directory(&self, equivalent: &Path, stats: &mut ReconcileStats) -> Result<(), SyncError> {
        if equivalent.exists() {
            self.ctx.decision(equivalent, "folder already in destination");
            return Ok(());
        }

        executor::apply(&SyncAction::CreateDir(equivalent.to_path_buf()), &self.ctx)?;
        tracing::info!(path = %equivalent.display(), "folder created in destination");
        stats.dirs_created += 1;
        Ok(())
    }

    fn sync_file(
        &self,
        path: &Path,
        equivalent: &Path,
        stats: &mut ReconcileStats,
    ) -> Result<(), SyncError> {
        if are_equivalent(path, equivalent) {
            self.ctx.decision(path, "unchanged");
            stats.unchanged += 1;
            return Ok(());
        }

        let action = SyncAction::Copy {
            from: path.to_path_buf(),
            to: equivalent.to_path_buf(),
        };
        let bytes = executor::apply(&action, &self.ctx)?;
        tracing::info!(path = %path.display(), "updated in destination");
        stats.copied += 1;
        stats.bytes_copied += bytes;
        Ok(())
    }
}

/// One-line summary of a pass
pub fn format_summary(stats: &ReconcileStats) -> String {
    format!(
        "Reconciled: copied {}  deleted {}  created dirs {}  unchanged {}  rejected {}  failed {} ({} transferred)",
        stats.copied,
        stats.deleted,
        stats.dirs_created,
        stats.unchanged,
        stats.rejected,
        stats.failed,
        HumanBytes(stats.bytes_copied)
    )
}
