//! Rotated-file selection for `file_rotation` log sources.

use probe_config::rotation::rotation_index;
use probe_config::{RotationPattern, Selector};
use std::fs;
use std::path::PathBuf;

use super::CollectError;

/// Pick the files a rotation pattern refers to from a directory listing.
///
/// Entries are considered in name order so ties resolve the same way no
/// matter how the filesystem lists them. `Biggest`/`Smallest` compare the
/// numeric suffix and yield at most one file; `All` yields every match.
pub fn select_rotated(pattern: &RotationPattern, mut entries: Vec<PathBuf>) -> Vec<PathBuf> {
    entries.sort();
    let matching = entries.into_iter().filter(|path| {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| pattern.matches(name))
    });

    let index_of = |path: &PathBuf| {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(rotation_index)
            .unwrap_or(0)
    };

    match pattern.selector {
        Selector::All => matching.collect(),
        Selector::Biggest => {
            let mut best: Option<(u64, PathBuf)> = None;
            for path in matching {
                let n = index_of(&path);
                if best.as_ref().map_or(true, |(b, _)| n > *b) {
                    best = Some((n, path));
                }
            }
            best.map(|(_, p)| p).into_iter().collect()
        }
        Selector::Smallest => {
            let mut best: Option<(u64, PathBuf)> = None;
            for path in matching {
                let n = index_of(&path);
                if best.as_ref().map_or(true, |(b, _)| n < *b) {
                    best = Some((n, path));
                }
            }
            best.map(|(_, p)| p).into_iter().collect()
        }
    }
}

/// List the regular files in the pattern's directory, following symlinks.
/// Dangling links and directories are left out.
pub fn list_candidates(pattern: &RotationPattern) -> Result<Vec<PathBuf>, CollectError> {
    let list_err = |e| CollectError::ListDir {
        path: pattern.dir.clone(),
        source: e,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(&pattern.dir).map_err(list_err)? {
        let path = entry.map_err(list_err)?.path();
        if fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false) {
            files.push(path);
        }
    }
    Ok(files)
}
