//! Configuration data model.
//!
//! Field spellings follow the on-disk descriptor surface: `tail_lines`,
//! `spacequota` and the uptime `frequency` are decimal strings and are parsed
//! through typed accessors rather than at deserialization time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::CRASHLOG_SENDER;

/// How a log source is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// Regular, mmap-able file.
    File,
    /// Non-seekable device or proc node, drained to end-of-stream.
    Node,
    /// Command line whose stdout is captured.
    Cmd,
    /// Family of numbered rotated files, `dir/prefix.[selector]`.
    FileRotation,
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogKind::File => write!(f, "file"),
            LogKind::Node => write!(f, "node"),
            LogKind::Cmd => write!(f, "cmd"),
            LogKind::FileRotation => write!(f, "file_rotation"),
        }
    }
}

/// A named, reusable evidence descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSource {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub path: String,
    /// Tail limit as written in the config; absent or `<= 0` means full copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail_lines: Option<String>,
}

impl LogSource {
    pub fn new(name: impl Into<String>, kind: LogKind, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            path: path.into(),
            tail_lines: None,
        }
    }

    pub fn with_tail_lines(mut self, lines: impl Into<String>) -> Self {
        self.tail_lines = Some(lines.into());
        self
    }

    /// Positive tail limit, or `None` when the whole file should be copied.
    pub fn tail_limit(&self) -> Option<usize> {
        self.tail_lines
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|n| *n > 0)
            .map(|n| n as usize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    File,
    Dir,
}

/// Where a crash is observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    pub path: PathBuf,
}

impl Trigger {
    /// Absolute path of the file that fired, given the event's relative path.
    ///
    /// A `file` trigger is the file itself; a `dir` trigger joins the
    /// relative name reported by the watcher.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        match self.kind {
            TriggerKind::File => self.path.clone(),
            TriggerKind::Dir => self.path.join(relative),
        }
    }
}

/// Reclassification family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReclassifyKind {
    /// Keep the configured name.
    #[default]
    Passthrough,
    /// Pick a variant by scanning the trigger file for literal markers.
    ContentMatch,
}

/// A refined crash type recognised by content markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashVariant {
    pub name: String,
    /// Every marker must occur in the trigger file for the variant to match.
    #[serde(default)]
    pub content: Vec<String>,
    /// Up to three markers whose line remainder becomes auxiliary data.
    #[serde(default)]
    pub data: Vec<String>,
    /// Extra log ids collected on top of the parent's.
    #[serde(default)]
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashDescriptor {
    pub name: String,
    pub trigger: Trigger,
    #[serde(default)]
    pub reclassify: ReclassifyKind,
    #[serde(default)]
    pub data: Vec<String>,
    #[serde(default)]
    pub variants: Vec<CrashVariant>,
    #[serde(default)]
    pub logs: Vec<String>,
}

/// Informational event definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoSpec {
    pub name: String,
    #[serde(default)]
    pub logs: Vec<String>,
}

impl InfoSpec {
    pub fn collects_logs(&self) -> bool {
        !self.logs.is_empty()
    }
}

/// File touched at startup so an external watch can be armed on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UptimeProbe {
    pub path: PathBuf,
    /// Marker period in seconds, decimal string.
    pub frequency: String,
}

impl UptimeProbe {
    pub fn frequency_secs(&self) -> Option<u64> {
        self.frequency.trim().parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderConfig {
    pub name: String,
    pub outdir: PathBuf,
    /// Disk budget for `outdir` in bytes, decimal string.
    pub spacequota: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<UptimeProbe>,
    /// Upper bound on a single `cmd` capture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd_timeout_secs: Option<u64>,
    /// VM-event sync bookkeeping file, derived during bootstrap.
    #[serde(skip)]
    pub vm_record_path: Option<PathBuf>,
}

impl SenderConfig {
    pub fn new(name: impl Into<String>, outdir: impl Into<PathBuf>, quota: u64) -> Self {
        Self {
            name: name.into(),
            outdir: outdir.into(),
            spacequota: quota.to_string(),
            uptime: None,
            cmd_timeout_secs: None,
            vm_record_path: None,
        }
    }

    pub fn quota_bytes(&self) -> Option<u64> {
        self.spacequota.trim().parse().ok()
    }

    pub fn is_crashlog(&self) -> bool {
        self.name == CRASHLOG_SENDER
    }
}

/// A guest VM whose shared history stream is synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmConfig {
    pub name: String,
    pub history_path: PathBuf,
}

/// Host integration knobs used by the default platform capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_reason_file: Option<PathBuf>,
    /// Loop device backing the guest disk image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_device: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debugfs: Option<String>,
}

/// The whole configuration registry, passed by reference into bootstrap and
/// dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub schema_version: String,
    #[serde(default)]
    pub logs: Vec<LogSource>,
    #[serde(default)]
    pub crashes: Vec<CrashDescriptor>,
    #[serde(default)]
    pub infos: Vec<InfoSpec>,
    #[serde(default)]
    pub senders: Vec<SenderConfig>,
    #[serde(default)]
    pub vms: Vec<VmConfig>,
    #[serde(default)]
    pub platform: PlatformConfig,
}

impl ProbeConfig {
    pub fn log(&self, name: &str) -> Option<&LogSource> {
        self.logs.iter().find(|l| l.name == name)
    }

    pub fn crash(&self, name: &str) -> Option<&CrashDescriptor> {
        self.crashes.iter().find(|c| c.name == name)
    }

    pub fn info(&self, name: &str) -> Option<&InfoSpec> {
        self.infos.iter().find(|i| i.name == name)
    }

    pub fn sender(&self, name: &str) -> Option<&SenderConfig> {
        self.senders.iter().find(|s| s.name == name)
    }

    pub fn crashlog_outdir(&self) -> Option<&Path> {
        self.sender(CRASHLOG_SENDER).map(|s| s.outdir.as_path())
    }
}
