//! Whole-file copy and tail extraction for regular files, drain for nodes.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::warn;

use super::mmap::{count_lines, line_offset, MappedFile};
use super::CollectError;

/// Result of a tail extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailOutcome {
    /// `lines` lines were written.
    Written { lines: usize },
    /// Source had no lines; nothing was produced.
    Empty,
}

/// Copy every byte of `src` to `dest`, replacing `dest`.
pub fn copy_file(src: &Path, dest: &Path) -> Result<u64, CollectError> {
    fs::copy(src, dest).map_err(|e| CollectError::Copy {
        src: src.to_path_buf(),
        dest: dest.to_path_buf(),
        source: e,
    })
}

/// Write the last `lines` lines of `src` to `dest`.
///
/// The mapping lives only for the duration of this call.
pub fn tail_file(src: &Path, dest: &Path, lines: usize) -> Result<TailOutcome, CollectError> {
    let mapped = MappedFile::open(src).map_err(|e| CollectError::Map {
        path: src.to_path_buf(),
        source: e,
    })?;
    let bytes = mapped.as_bytes();

    let total = count_lines(bytes);
    if total == 0 {
        warn!(path = %src.display(), "no lines to tail, skipping");
        return Ok(TailOutcome::Empty);
    }

    let start_line = total.saturating_sub(lines) + 1;
    let start = line_offset(bytes, start_line).unwrap_or(bytes.len());
    fs::write(dest, &bytes[start..]).map_err(|e| CollectError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(TailOutcome::Written {
        lines: total - (start_line - 1),
    })
}

/// Read a non-seekable source until end-of-stream into `dest`.
pub fn drain_node(src: &Path, dest: &Path) -> Result<u64, CollectError> {
    let copy_err = |e: io::Error| CollectError::Copy {
        src: src.to_path_buf(),
        dest: dest.to_path_buf(),
        source: e,
    };
    let mut reader = File::open(src).map_err(copy_err)?;
    let mut writer = File::create(dest).map_err(copy_err)?;
    io::copy(&mut reader, &mut writer).map_err(copy_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn numbered(n: usize) -> String {
        (1..=n).map(|i| format!("line {i}\n")).collect()
    }

    #[test]
    fn tail_keeps_last_lines() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        fs::write(&src, numbered(10)).unwrap();

        let outcome = tail_file(&src, &dest, 3).unwrap();
        assert_eq!(outcome, TailOutcome::Written { lines: 3 });
        assert_eq!(
            fs::read_to_string(&dest).unwrap(),
            "line 8\nline 9\nline 10\n"
        );
    }

    #[test]
    fn tail_larger_than_file_copies_all() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        fs::write(&src, "a\nb").unwrap();

        let outcome = tail_file(&src, &dest, 50).unwrap();
        assert_eq!(outcome, TailOutcome::Written { lines: 2 });
        assert_eq!(fs::read_to_string(&dest).unwrap(), "a\nb");
    }

    #[test]
    fn tail_of_empty_file_produces_nothing() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        fs::write(&src, "").unwrap();

        assert_eq!(tail_file(&src, &dest, 5).unwrap(), TailOutcome::Empty);
        assert!(!dest.exists());
    }

    #[test]
    fn tail_of_missing_file_is_map_error() {
        let dir = TempDir::new().unwrap();
        let err = tail_file(&dir.path().join("nope"), &dir.path().join("d"), 5).unwrap_err();
        assert!(matches!(err, CollectError::Map { .. }));
    }

    #[test]
    fn drain_reads_to_eof() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("node");
        let dest = dir.path().join("dest");
        fs::write(&src, "kernel: hello\n").unwrap();

        assert_eq!(drain_node(&src, &dest).unwrap(), 14);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "kernel: hello\n");
    }

    proptest! {
        #[test]
        fn tail_window_matches_line_arithmetic(total in 1usize..60, n in 1usize..80) {
            let dir = TempDir::new().unwrap();
            let src = dir.path().join("src");
            let dest = dir.path().join("dest");
            fs::write(&src, numbered(total)).unwrap();

            let outcome = tail_file(&src, &dest, n).unwrap();
            let skipped = total.saturating_sub(n);
            prop_assert_eq!(outcome, TailOutcome::Written { lines: total - skipped });

            let written = fs::read_to_string(&dest).unwrap();
            let first = written.lines().next().unwrap().to_string();
            prop_assert_eq!(first, format!("line {}", skipped + 1));
            prop_assert_eq!(written.lines().count(), total - skipped);
        }
    }
}
