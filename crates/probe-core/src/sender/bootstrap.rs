//! Sender initialization.

use probe_config::{ProbeConfig, SenderConfig};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::CrashlogSender;
use crate::event::EventRecord;
use crate::history::{HistoryError, HistoryLog};
use crate::platform::{Platform, PlatformError};
use crate::vm_history::FileVmHistory;

/// VM sync bookkeeping file name under each sender's `outdir`.
pub const VM_RECORD_FILE: &str = "vmrecordid";

/// Startup failures. Each one aborts daemon startup.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("cannot create output directory {path}: {source}")]
    OutDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sender {sender}: properties init failed: {source}")]
    Properties {
        sender: String,
        #[source]
        source: PlatformError,
    },

    #[error("cannot create uptime marker {path}: {source}")]
    UptimeMarker {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sender {sender}: invalid spacequota {value:?}")]
    Quota { sender: String, value: String },

    #[error("cannot open history: {0}")]
    History(#[from] HistoryError),
}

/// Every initialized sender, plus the crashlog dispatcher when configured.
pub struct SenderSet {
    senders: Vec<SenderConfig>,
    crashlog: Option<CrashlogSender>,
}

impl SenderSet {
    pub fn senders(&self) -> &[SenderConfig] {
        &self.senders
    }

    pub fn crashlog(&self) -> Option<&CrashlogSender> {
        self.crashlog.as_ref()
    }

    pub fn crashlog_mut(&mut self) -> Option<&mut CrashlogSender> {
        self.crashlog.as_mut()
    }

    /// Hand `event` to the sender bound to the dispatch table.
    pub fn dispatch(&mut self, registry: &ProbeConfig, event: &mut EventRecord) {
        match self.crashlog.as_mut() {
            Some(sender) => sender.send(registry, event),
            None => warn!(event_type = %event.event_type, "no crashlog sender, event dropped"),
        }
    }
}

/// Prepare every sender's output tree and bind the crashlog dispatcher.
///
/// Derived paths are stored back into `registry`.
pub fn init_senders(
    registry: &mut ProbeConfig,
    platform: Arc<dyn Platform>,
) -> Result<SenderSet, BootstrapError> {
    let mut crashlog = None;

    for sender in registry.senders.iter_mut() {
        let record_path = sender.outdir.join(VM_RECORD_FILE);
        sender.vm_record_path = Some(record_path.clone());

        fs::create_dir_all(&sender.outdir).map_err(|e| BootstrapError::OutDir {
            path: sender.outdir.clone(),
            source: e,
        })?;

        platform
            .init_properties(sender)
            .map_err(|e| BootstrapError::Properties {
                sender: sender.name.clone(),
                source: e,
            })?;

        if let Some(probe) = &sender.uptime {
            ensure_marker(&probe.path)?;
        }

        if sender.is_crashlog() {
            let quota = sender.quota_bytes().ok_or_else(|| BootstrapError::Quota {
                sender: sender.name.clone(),
                value: sender.spacequota.clone(),
            })?;
            let history = HistoryLog::open(&sender.outdir)?;
            debug!(path = %history.path().display(), "history opened");
            let vm_history = FileVmHistory::open(record_path)?;

            crashlog = Some(
                CrashlogSender::new(sender.clone(), quota, Arc::clone(&platform), Box::new(history))
                    .with_vm_history(Box::new(vm_history)),
            );
        }

        info!(sender = %sender.name, outdir = %sender.outdir.display(), "sender initialized");
    }

    Ok(SenderSet {
        senders: registry.senders.clone(),
        crashlog,
    })
}

/// Create `path` empty if missing so a watch can be armed on it.
fn ensure_marker(path: &Path) -> Result<(), BootstrapError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| BootstrapError::UptimeMarker {
            path: path.to_path_buf(),
            source: e,
        })
}
