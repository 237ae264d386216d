//! Log collection engine.
//!
//! Strategies, selected by [`LogKind`](probe_config::LogKind):
//! - Plain copy and tail extraction for regular files (tail via mmap)
//! - Drain to end-of-stream for device/proc nodes
//! - Subprocess capture for command lines
//! - Rotation resolution that delegates to plain/tail per selected file

mod copy;
mod engine;
pub mod mmap;
mod rotation;
pub mod tool_runner;

pub use copy::{copy_file, drain_node, tail_file, TailOutcome};
pub use engine::{uptime_label, LogCollector, SLOW_COLLECTION};
pub use rotation::{list_candidates, select_rotated};
pub use tool_runner::{Sink, ToolError, ToolOutcome, ToolRunner, ToolSpec, DEFAULT_TIMEOUT_SECS};

use probe_config::RotationError;
use std::path::PathBuf;
use thiserror::Error;

use crate::platform::PlatformError;

/// Failure collecting one log source. Never affects sibling sources.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("copy {src} -> {dest} failed: {source}")]
    Copy {
        src: PathBuf,
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("mmap {path} failed: {source}")]
    Map {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write {path} failed: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("list {path} failed: {source}")]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rotation path: {0}")]
    Rotation(#[from] RotationError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("cannot label tail output: {0}")]
    Uptime(#[from] PlatformError),
}
