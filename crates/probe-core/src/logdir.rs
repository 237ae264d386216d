//! Evidence directory allocation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// How many `_N` suffixes are tried before giving up on a name.
const MAX_SUFFIX: u32 = 1000;

/// Naming family of an evidence directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirMode {
    Crash,
    Stats,
    VmEvent,
}

impl DirMode {
    pub fn prefix(&self) -> &'static str {
        match self {
            DirMode::Crash => "crashlog",
            DirMode::Stats => "stats",
            DirMode::VmEvent => "vmevent",
        }
    }
}

#[derive(Debug, Error)]
pub enum LogDirError {
    #[error("cannot create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no free directory name for {base} after {MAX_SUFFIX} attempts")]
    Exhausted { base: String },

    #[error("cannot write descriptor {path}: {source}")]
    Descriptor {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Creates uniquely named evidence directories under a sender's `outdir`.
#[derive(Debug, Clone)]
pub struct LogDirAllocator {
    root: PathBuf,
}

impl LogDirAllocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create `<prefix>_<key>`, or the first free `<prefix>_<key>_<n>`.
    ///
    /// `create_dir` fails on an existing name, so the returned directory is
    /// never shared with another event.
    pub fn allocate(&self, mode: DirMode, key: &str) -> Result<PathBuf, LogDirError> {
        let base = format!("{}_{}", mode.prefix(), key);
        for n in 0..MAX_SUFFIX {
            let name = if n == 0 {
                base.clone()
            } else {
                format!("{base}_{n}")
            };
            let path = self.root.join(name);
            match fs::create_dir(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "evidence directory allocated");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(LogDirError::Create { path, source: e }),
            }
        }
        Err(LogDirError::Exhausted { base })
    }
}
