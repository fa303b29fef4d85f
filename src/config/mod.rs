//! Configuration management

use crate::types::SyncError;
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Task file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "tandem.toml";

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(
    name = "tandem",
    version,
    about = "Mirrors every configured origin folder into its destination folder"
)]
pub struct Cli {
    /// Task file to load
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log every decision, not only the mutations
    #[arg(short, long)]
    pub verbose: bool,

    /// Decide and log, but never touch the destination
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Run one full reconciliation per task and exit
    #[arg(long)]
    pub once: bool,
}

/// Process-level configuration built from the CLI
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Task file path
    pub config_file: PathBuf,

    /// Verbose logging
    pub verbose: bool,

    /// Dry run (decide, don't mutate)
    pub dry_run: bool,

    /// Skip the change replicator
    pub once: bool,
}

impl TryFrom<Cli> for RunConfig {
    type Error = SyncError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        if !cli.config.is_file() {
            return Err(SyncError::Config(format!(
                "Task file not found: {}",
                cli.config.display()
            )));
        }

        Ok(Self {
            config_file: cli.config,
            verbose: cli.verbose,
            dry_run: cli.dry_run,
            once: cli.once,
        })
    }
}

impl RunConfig {
    /// Build the per-task context handed to every component
    pub fn context_for(&self, task: &Task) -> SyncContext {
        SyncContext {
            label: task.label(),
            verbose: self.verbose,
            dry_run: self.dry_run,
        }
    }
}

/// Explicit context passed to each component at construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncContext {
    /// Task label recorded on every log line
    pub label: String,

    /// Log per-entry decisions at info level
    pub verbose: bool,

    /// Suppress copy/delete/mkdir mutations
    pub dry_run: bool,
}

impl SyncContext {
    /// Tracing span wrapping all work done for this task
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!("task", name = %self.label, dry_run = self.dry_run)
    }

    /// Log a decision that did not mutate anything
    ///
    /// Visible at info level in verbose mode, at debug level otherwise.
    pub fn decision(&self, path: &Path, message: &str) {
        if self.verbose {
            tracing::info!(path = %path.display(), "{message}");
        } else {
            tracing::debug!(path = %path.display(), "{message}");
        }
    }
}

/// One origin/destination pair plus its filter rules
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    /// Authoritative tree
    pub origin: PathBuf,

    /// Tree kept in sync with origin
    pub destination: PathBuf,

    /// Files larger than this are ignored (0 = unlimited)
    #[serde(default)]
    pub max_file_size: u64,

    /// Extensions (no dot) never synchronized
    #[serde(default)]
    pub ignore_file_ext: Vec<String>,

    /// Folder names never synchronized
    #[serde(default)]
    pub ignore_folder: Vec<String>,
}

impl Task {
    /// Human-readable name used in logs
    pub fn label(&self) -> String {
        format!("{} -> {}", self.origin.display(), self.destination.display())
    }

    fn normalize(mut self) -> Self {
        self.ignore_file_ext = normalize_names(self.ignore_file_ext);
        self.ignore_folder = normalize_names(self.ignore_folder);
        self
    }

    fn validate(&self, index: usize) -> Result<(), SyncError> {
        if self.origin.as_os_str().is_empty() {
            return Err(SyncError::Config(format!("task #{index}: origin is empty")));
        }
        if self.destination.as_os_str().is_empty() {
            return Err(SyncError::Config(format!(
                "task #{index}: destination is empty"
            )));
        }
        if self.origin == self.destination {
            return Err(SyncError::Config(format!(
                "task #{index}: origin and destination cannot be the same"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskFile {
    #[serde(default, rename = "task")]
    tasks: Vec<Task>,
}

/// Parse tasks from TOML text
pub fn parse_tasks(text: &str) -> Result<Vec<Task>, SyncError> {
    let file: TaskFile =
        toml::from_str(text).map_err(|e| SyncError::Config(format!("Invalid task file: {e}")))?;

    if file.tasks.is_empty() {
        return Err(SyncError::Config(
            "Task file defines no [[task]] entries".to_string(),
        ));
    }

    let tasks: Vec<Task> = file.tasks.into_iter().map(Task::normalize).collect();
    for (index, task) in tasks.iter().enumerate() {
        task.validate(index + 1)?;
    }
    Ok(tasks)
}

/// Load tasks from a TOML task file
pub fn load_tasks(path: &Path) -> Result<Vec<Task>, SyncError> {
    let text = std::fs::read_to_string(path)?;
    parse_tasks(&text)
}

fn normalize_names(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim().to_lowercase();
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}
