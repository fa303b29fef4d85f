//! Main sync command

use crate::config::{load_tasks, RunConfig};
use crate::reconcile::{format_summary, ReconcileStats};
use crate::task::{SyncTask, TaskHandle};
use crate::types::SyncError;
use crate::watch::ReplicatorState;
use tokio::task::JoinSet;

/// How the supervision of running tasks ended
#[derive(Debug, Clone, PartialEq, Eq)]
enum Supervision {
    Interrupted,
    /// Label of the first task whose replicator stopped on its own
    Stopped(String),
}

/// Run every task of the task file
///
/// With `once`, each task gets a single reconciliation pass and the call
/// returns. Otherwise every task is started and the call blocks until ctrl-c
/// or until any task stops providing continuous sync.
///
/// A task that fails validation or cannot be monitored is reported and
/// skipped; the run fails only when no task could be started.
pub fn run(config: RunConfig) -> Result<(), SyncError> {
    let tasks = load_tasks(&config.config_file)?;
    tracing::info!(
        tasks = tasks.len(),
        config = %config.config_file.display(),
        dry_run = config.dry_run,
        "loaded task file"
    );

    let mut handles: Vec<TaskHandle> = Vec::new();
    let mut passes: Vec<ReconcileStats> = Vec::new();
    let mut failures: Vec<SyncError> = Vec::new();

    for task in &tasks {
        let ctx = config.context_for(task);
        let built = if config.once {
            SyncTask::single_pass(task, ctx.clone())
        } else {
            SyncTask::new(task, ctx.clone())
        };
        let sync = match built {
            Ok(sync) => sync,
            Err(err) => {
                tracing::error!(task = %ctx.label, error = %err, "task can not start");
                failures.push(err);
                continue;
            }
        };

        if config.once {
            passes.push(sync.reconcile_once());
            continue;
        }

        match sync.start() {
            Ok(handle) => handles.push(handle),
            Err(err) => {
                tracing::error!(task = %ctx.label, error = %err, "task aborted");
                failures.push(err);
            }
        }
    }

    if config.once {
        if passes.is_empty() {
            return Err(first_failure(failures));
        }
        tracing::info!("{}", format_summary(&total(&passes)));
        return Ok(());
    }

    if handles.is_empty() {
        return Err(first_failure(failures));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(supervise(&handles));

    for handle in &handles {
        handle.stop();
    }
    for handle in handles {
        handle.join();
    }

    match outcome {
        Supervision::Interrupted => {
            tracing::info!("interrupted: all tasks stopped");
            Ok(())
        }
        Supervision::Stopped(label) => {
            tracing::error!(task = %label, "continuous sync stopped: shutting down");
            Err(SyncError::ReplicationStopped(label))
        }
    }
}

/// Wait for ctrl-c or for the first replicator to stop
async fn supervise(handles: &[TaskHandle]) -> Supervision {
    let mut watchers = JoinSet::new();
    for handle in handles {
        let mut rx = handle.subscribe();
        let label = handle.label().to_string();
        watchers.spawn(async move {
            // A dropped sender means the worker is gone as well
            let _ = rx.wait_for(|state| *state == ReplicatorState::Stopped).await;
            label
        });
    }

    let first_stopped = async {
        match watchers.join_next().await {
            Some(Ok(label)) => label,
            Some(Err(err)) => format!("unknown task ({err})"),
            None => std::future::pending().await,
        }
    };

    let interrupted = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = interrupted => Supervision::Interrupted,
        label = first_stopped => Supervision::Stopped(label),
    }
}

fn total(passes: &[ReconcileStats]) -> ReconcileStats {
    passes.iter().fold(ReconcileStats::default(), |mut acc, s| {
        acc.copied += s.copied;
        acc.deleted += s.deleted;
        acc.dirs_created += s.dirs_created;
        acc.unchanged += s.unchanged;
        acc.rejected += s.rejected;
        acc.failed += s.failed;
        acc.bytes_copied += s.bytes_copied;
        acc
    })
}

fn first_failure(failures: Vec<SyncError>) -> SyncError {
    failures
        .into_iter()
        .next()
        .unwrap_or_else(|| SyncError::Config("no task could be started".to_string()))
}
