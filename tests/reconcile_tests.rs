//! Reconciler integration tests
//!
//! Each test builds an origin and a destination tree in temporary folders
//! and checks the outcome of full prune-then-copy passes.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tandem::diff::are_equivalent;
use tandem::{EntryFilter, ReconcileStats, Reconciler, SyncContext};
use tempfile::TempDir;

// ═══════════════════════════════════════════════════════════
// Test Helpers
// ═══════════════════════════════════════════════════════════

/// Start of a clock minute, in seconds since the epoch
const MINUTE_START: u64 = 1_700_000_040;

struct Pair {
    origin: TempDir,
    dest: TempDir,
}

impl Pair {
    fn new() -> Self {
        Self {
            origin: TempDir::new().expect("create origin tempdir"),
            dest: TempDir::new().expect("create dest tempdir"),
        }
    }

    fn origin(&self) -> &Path {
        self.origin.path()
    }

    fn dest(&self) -> &Path {
        self.dest.path()
    }

    fn run_with(&self, filter: EntryFilter, ctx: SyncContext) -> ReconcileStats {
        Reconciler::new(
            self.origin().to_path_buf(),
            self.dest().to_path_buf(),
            Arc::new(filter),
            ctx,
        )
        .run()
    }

    fn run(&self, filter: EntryFilter) -> ReconcileStats {
        self.run_with(filter, SyncContext::default())
    }
}

fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, content).expect("write test file");
}

fn set_mtime_secs(path: &Path, secs: u64) {
    let mtime = filetime::FileTime::from_system_time(UNIX_EPOCH + Duration::from_secs(secs));
    filetime::set_file_mtime(path, mtime).expect("set mtime");
}

// ═══════════════════════════════════════════════════════════
// Copy / Prune
// ═══════════════════════════════════════════════════════════

#[test]
fn test_copies_missing_file_and_equivalence_holds() {
    let pair = Pair::new();
    write(&pair.origin().join("a.txt"), b"alpha");

    let stats = pair.run(EntryFilter::new());

    let copied = pair.dest().join("a.txt");
    assert_eq!(fs::read(&copied).expect("read copy"), b"alpha");
    assert!(are_equivalent(&pair.origin().join("a.txt"), &copied));
    assert_eq!(stats.copied, 1);
    assert_eq!(stats.bytes_copied, 5);
}

#[test]
fn test_copies_nested_tree() {
    let pair = Pair::new();
    write(&pair.origin().join("docs/2024/report.txt"), b"report");
    fs::create_dir_all(pair.origin().join("empty/inside")).expect("create empty dirs");

    let stats = pair.run(EntryFilter::new());

    assert_eq!(
        fs::read(pair.dest().join("docs/2024/report.txt")).expect("read nested copy"),
        b"report"
    );
    assert!(pair.dest().join("empty/inside").is_dir());
    assert_eq!(stats.dirs_created, 4);
}

#[test]
fn test_prunes_stale_file_and_directory() {
    let pair = Pair::new();
    write(&pair.origin().join("keep.txt"), b"keep");
    write(&pair.dest().join("stale.txt"), b"stale");
    write(&pair.dest().join("old/deep/file.txt"), b"old");

    let stats = pair.run(EntryFilter::new());

    assert!(!pair.dest().join("stale.txt").exists());
    assert!(!pair.dest().join("old").exists());
    assert!(pair.dest().join("keep.txt").exists());
    assert_eq!(stats.deleted, 2, "the stale directory counts once");
}

#[test]
fn test_prune_removes_stale_entries_below_kept_directories() {
    let pair = Pair::new();
    write(&pair.origin().join("shared/current.txt"), b"current");
    write(&pair.dest().join("shared/current.txt"), b"current");
    write(&pair.dest().join("shared/removed.txt"), b"removed");

    pair.run(EntryFilter::new());

    assert!(pair.dest().join("shared/current.txt").exists());
    assert!(!pair.dest().join("shared/removed.txt").exists());
}

#[test]
fn test_prune_ignores_the_filter() {
    let pair = Pair::new();
    write(&pair.dest().join("leftover.tmp"), b"tmp");
    write(&pair.dest().join("node_modules/pkg.js"), b"js");

    let mut filter = EntryFilter::new();
    filter.add_ignored_extension("tmp");
    filter.add_ignored_folder("node_modules");
    pair.run(filter);

    assert!(!pair.dest().join("leftover.tmp").exists());
    assert!(!pair.dest().join("node_modules").exists());
}

#[test]
fn test_second_pass_is_idempotent() {
    let pair = Pair::new();
    write(&pair.origin().join("a.txt"), b"a");
    write(&pair.origin().join("sub/b.txt"), b"bb");
    write(&pair.origin().join("sub/deeper/c.txt"), b"ccc");
    write(&pair.dest().join("stale.txt"), b"stale");

    let first = pair.run(EntryFilter::new());
    assert!(first.mutations() > 0);

    let second = pair.run(EntryFilter::new());
    assert_eq!(second.copied, 0);
    assert_eq!(second.deleted, 0);
    assert_eq!(second.dirs_created, 0);
    assert_eq!(second.unchanged, 3);
}

// ═══════════════════════════════════════════════════════════
// Equivalence boundaries
// ═══════════════════════════════════════════════════════════

#[test]
fn test_same_minute_same_size_is_not_copied() {
    let pair = Pair::new();
    let origin = pair.origin().join("same.txt");
    let dest = pair.dest().join("same.txt");
    write(&origin, b"origin");
    write(&dest, b"destin");
    set_mtime_secs(&origin, MINUTE_START + 10);
    set_mtime_secs(&dest, MINUTE_START + 40);

    let stats = pair.run(EntryFilter::new());

    assert_eq!(stats.copied, 0);
    assert_eq!(stats.unchanged, 1);
    assert_eq!(fs::read(&dest).expect("read dest"), b"destin");
}

#[test]
fn test_minute_boundary_triggers_copy() {
    let pair = Pair::new();
    let origin = pair.origin().join("same.txt");
    let dest = pair.dest().join("same.txt");
    write(&origin, b"origin");
    write(&dest, b"destin");
    set_mtime_secs(&origin, MINUTE_START + 70);
    set_mtime_secs(&dest, MINUTE_START + 9);

    let stats = pair.run(EntryFilter::new());

    assert_eq!(stats.copied, 1);
    assert_eq!(fs::read(&dest).expect("read dest"), b"origin");
}

#[test]
fn test_size_difference_triggers_copy() {
    let pair = Pair::new();
    let origin = pair.origin().join("grown.txt");
    let dest = pair.dest().join("grown.txt");
    write(&origin, b"longer content");
    write(&dest, b"short");
    set_mtime_secs(&origin, MINUTE_START);
    set_mtime_secs(&dest, MINUTE_START);

    pair.run(EntryFilter::new());

    assert_eq!(fs::read(&dest).expect("read dest"), b"longer content");
}

// ═══════════════════════════════════════════════════════════
// Filter rules
// ═══════════════════════════════════════════════════════════

#[test]
fn test_size_limit_boundary() {
    let pair = Pair::new();
    write(&pair.origin().join("exact.bin"), &[1u8; 100]);
    write(&pair.origin().join("over.bin"), &[2u8; 101]);
    write(&pair.dest().join("over.bin"), b"different");

    let mut filter = EntryFilter::new();
    filter.set_max_size(100);
    let stats = pair.run(filter);

    assert!(pair.dest().join("exact.bin").exists());
    assert_eq!(
        fs::read(pair.dest().join("over.bin")).expect("read dest"),
        b"different",
        "rejected file must never be copied"
    );
    assert_eq!(stats.rejected, 1);
}

#[test]
fn test_ignored_extension_is_never_copied_nor_deleted() {
    let pair = Pair::new();
    write(&pair.origin().join("temp.tmp"), b"origin version");
    write(&pair.dest().join("temp.tmp"), b"dest");
    write(&pair.origin().join("other.TMP"), b"upper");

    let mut filter = EntryFilter::new();
    filter.add_ignored_extension("tmp");
    pair.run(filter);

    assert_eq!(fs::read(pair.dest().join("temp.tmp")).expect("read dest"), b"dest");
    assert!(!pair.dest().join("other.TMP").exists());
}

#[test]
fn test_ignored_folder_skips_whole_subtree() {
    let pair = Pair::new();
    write(&pair.origin().join("IGNORED/needs_copy.txt"), b"x");
    write(&pair.origin().join("src/ignored/deep/file.txt"), b"y");
    write(&pair.origin().join("src/main.txt"), b"z");

    let mut filter = EntryFilter::new();
    filter.add_ignored_folder("ignored");
    let stats = pair.run(filter);

    assert!(!pair.dest().join("IGNORED").exists());
    assert!(!pair.dest().join("src/ignored").exists());
    assert!(pair.dest().join("src/main.txt").exists());
    assert_eq!(stats.rejected, 2);
}

// ═══════════════════════════════════════════════════════════
// Failures and dry run
// ═══════════════════════════════════════════════════════════

#[test]
fn test_folder_creation_failure_skips_only_that_subtree() {
    let pair = Pair::new();
    write(&pair.origin().join("a/b/f.txt"), b"f");
    write(&pair.origin().join("c.txt"), b"c");
    // A file where the destination needs the folder `a`
    write(&pair.dest().join("a"), b"in the way");

    let stats = pair.run(EntryFilter::new());

    assert_eq!(stats.failed, 1);
    assert!(pair.dest().join("a").is_file());
    assert_eq!(fs::read(pair.dest().join("c.txt")).expect("read sibling"), b"c");
}

#[test]
fn test_dry_run_decides_without_mutating() {
    let pair = Pair::new();
    write(&pair.origin().join("new.txt"), b"should-not-copy");
    write(&pair.origin().join("dir/nested.txt"), b"nested");
    write(&pair.dest().join("old.txt"), b"should-not-delete");

    let ctx = SyncContext {
        label: "dry".to_string(),
        verbose: true,
        dry_run: true,
    };
    let stats = pair.run_with(EntryFilter::new(), ctx);

    assert_eq!(stats.copied, 2);
    assert_eq!(stats.deleted, 1);
    assert_eq!(stats.dirs_created, 1);
    assert_eq!(stats.bytes_copied, 0);
    assert!(!pair.dest().join("new.txt").exists());
    assert!(!pair.dest().join("dir").exists());
    assert!(pair.dest().join("old.txt").exists());
}

#[test]
fn test_hidden_entries_are_synchronized() {
    let pair = Pair::new();
    write(&pair.origin().join(".config/settings"), b"s");
    write(&pair.origin().join(".gitignore"), b"*.txt\n");
    write(&pair.origin().join("notes.txt"), b"n");

    pair.run(EntryFilter::new());

    assert!(pair.dest().join(".config/settings").exists());
    assert!(pair.dest().join(".gitignore").exists());
    assert!(pair.dest().join("notes.txt").exists(), "ignore files must not apply");
}

#[cfg(unix)]
#[test]
fn test_symlink_cycle_does_not_recurse_forever() {
    let pair = Pair::new();
    write(&pair.origin().join("sub/a.txt"), b"a");
    std::os::unix::fs::symlink(pair.origin(), pair.origin().join("sub/loop"))
        .expect("create cyclic symlink");

    let stats = pair.run(EntryFilter::new());

    assert!(pair.dest().join("sub/a.txt").exists());
    assert!(stats.failed >= 1, "the cycle is reported");
}
