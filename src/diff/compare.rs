//! File comparison logic

use crate::types::FileEntry;
use std::path::Path;

const MILLIS_PER_MINUTE: i128 = 60_000;

/// Decide whether a destination file already matches its origin
///
/// Metadata-only comparison, no content is read:
///
/// 1. **Missing destination**: not equivalent
/// 2. **Size mismatch**: not equivalent
/// 3. **Modification time**: equivalent only when both timestamps fall in
///    the same whole minute. This is a bucket, not a tolerance window: two
///    files one millisecond apart across a minute boundary differ.
///
/// Metadata that cannot be read counts as a mismatch.
pub fn are_equivalent(origin: &Path, destination: &Path) -> bool {
    let Ok(dest) = FileEntry::from_path(destination) else {
        return false;
    };
    let Ok(orig) = FileEntry::from_path(origin) else {
        return false;
    };

    orig.size == dest.size && same_minute(&orig, &dest)
}

/// Whether two entries were last modified within the same clock minute
pub fn same_minute(a: &FileEntry, b: &FileEntry) -> bool {
    a.mtime_millis() / MILLIS_PER_MINUTE == b.mtime_millis() / MILLIS_PER_MINUTE
}
