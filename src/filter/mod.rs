//! Entry filter - decides which origin entries take part in synchronization

use crate::config::Task;
use crate::types::FileEntry;
use std::collections::HashSet;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Size, extension and folder-name rules of one task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    ignored_extensions: HashSet<String>,
    ignored_folders: HashSet<String>,
    max_size: u64,
}

impl EntryFilter {
    /// Filter accepting everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter configured from a task's rules
    pub fn from_task(task: &Task) -> Self {
        let mut filter = Self::new();
        filter.set_max_size(task.max_file_size);
        filter.set_ignored_extensions(&task.ignore_file_ext);
        filter.set_ignored_folders(&task.ignore_folder);
        filter
    }

    /// Decide whether an entry participates in synchronization
    ///
    /// Directories are judged by name only. Files are rejected when larger
    /// than the size limit or when their extension is ignored.
    pub fn accepts(&self, entry: &FileEntry) -> bool {
        if entry.is_dir {
            let name = entry.name().to_lowercase();
            return !self.ignored_folders.contains(&name);
        }

        if self.max_size > 0 && entry.size > self.max_size {
            return false;
        }

        !self.ignored_extensions.contains(&extension_of(&entry.name()))
    }

    /// Judge a path from its live metadata
    ///
    /// An unreadable entry is judged as an empty file, so only the extension
    /// rule can reject it.
    pub fn accepts_path(&self, path: &Path) -> bool {
        let entry = FileEntry::from_path(path)
            .unwrap_or_else(|_| FileEntry::new(path.to_path_buf(), 0, UNIX_EPOCH));
        self.accepts(&entry)
    }

    /// Replace the ignored extensions
    pub fn set_ignored_extensions<S: AsRef<str>>(&mut self, extensions: &[S]) {
        self.ignored_extensions.clear();
        for ext in extensions {
            self.add_ignored_extension(ext.as_ref());
        }
    }

    /// Ignore one more extension (without the leading dot)
    pub fn add_ignored_extension(&mut self, ext: &str) {
        if let Some(ext) = normalize(ext) {
            self.ignored_extensions.insert(ext);
        }
    }

    /// Replace the ignored folder names
    pub fn set_ignored_folders<S: AsRef<str>>(&mut self, names: &[S]) {
        self.ignored_folders.clear();
        for name in names {
            self.add_ignored_folder(name.as_ref());
        }
    }

    /// Ignore one more folder name
    pub fn add_ignored_folder(&mut self, name: &str) {
        if let Some(name) = normalize(name) {
            self.ignored_folders.insert(name);
        }
    }

    /// Set the size limit in bytes; 0 clears it
    pub fn set_max_size(&mut self, max_size: u64) {
        self.max_size = max_size;
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }
}

fn normalize(value: &str) -> Option<String> {
    let value = value.trim().to_lowercase();
    (!value.is_empty()).then_some(value)
}

/// Lowercased text after the last dot; empty when there is none or the name ends with one
fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(index) if !name.ends_with('.') => name[index + 1..].to_lowercase(),
        _ => String::new(),
    }
}
