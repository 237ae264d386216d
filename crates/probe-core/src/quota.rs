//! Disk-space admission check for a sender's output tree.
//!
//! The check and the write it gates are not atomic. That is only sound while
//! a single process writes into the tree; senders sharing an `outdir` can
//! overshoot the quota by one write each.

use std::path::Path;
use tracing::trace;
use walkdir::WalkDir;

/// Recursive size in bytes of regular files under `dir`.
///
/// Unreadable entries are skipped; a missing directory counts as empty.
pub fn dir_usage(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

/// True iff current usage of `dir` is strictly below `quota` bytes.
pub fn space_available(dir: &Path, quota: u64) -> bool {
    let used = dir_usage(dir);
    trace!(dir = %dir.display(), used, quota, "quota check");
    used < quota
}
