//! Senders: per-sender output state and the crashlog event dispatcher.
//!
//! [`init_senders`] prepares every configured sender's output tree and
//! builds the [`CrashlogSender`], which routes each [`EventRecord`] to the
//! crash, info, uptime, reboot or VM handler.

mod bootstrap;
mod crash;
mod info;
mod periodic;
mod vm;

pub use bootstrap::{init_senders, BootstrapError, SenderSet, VM_RECORD_FILE};
pub use vm::VmEventLine;

use probe_config::{LogKind, LogSource, ProbeConfig, SenderConfig};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::collect::{LogCollector, ToolRunner};
use crate::event::{EventRecord, EventType};
use crate::eventid::{EventIdGenerator, Sha256EventIds};
use crate::history::{HistoryRecord, HistoryStore};
use crate::logdir::LogDirAllocator;
use crate::platform::Platform;
use crate::quota::space_available;
use crate::vm_history::VmHistorySource;

/// Info event raised when a sender's quota is exhausted.
pub const SPACE_FULL: &str = "SPACE_FULL";

/// The sender that owns the event pipelines.
pub struct CrashlogSender {
    config: SenderConfig,
    quota: u64,
    runner: ToolRunner,
    platform: Arc<dyn Platform>,
    ids: Box<dyn EventIdGenerator>,
    history: Box<dyn HistoryStore>,
    vm_history: Option<Box<dyn VmHistorySource>>,
    dirs: LogDirAllocator,
    space_full_raised: bool,
}

impl CrashlogSender {
    /// `quota` is the already-parsed `spacequota` of `config`.
    pub fn new(
        config: SenderConfig,
        quota: u64,
        platform: Arc<dyn Platform>,
        history: Box<dyn HistoryStore>,
    ) -> Self {
        let runner = match config.cmd_timeout_secs {
            Some(secs) => ToolRunner::new(Duration::from_secs(secs)),
            None => ToolRunner::with_defaults(),
        };
        let dirs = LogDirAllocator::new(config.outdir.clone());
        Self {
            config,
            quota,
            runner,
            platform,
            ids: Box::new(Sha256EventIds::new()),
            history,
            vm_history: None,
            dirs,
            space_full_raised: false,
        }
    }

    pub fn with_event_ids(mut self, ids: Box<dyn EventIdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_vm_history(mut self, source: Box<dyn VmHistorySource>) -> Self {
        self.vm_history = Some(source);
        self
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// Whether `SPACE_FULL` has been recorded by this process.
    pub fn space_full_raised(&self) -> bool {
        self.space_full_raised
    }

    /// Route one event to its handler. Runs to completion on the caller's
    /// thread.
    pub fn send(&mut self, registry: &ProbeConfig, event: &mut EventRecord) {
        debug!(
            event_type = %event.event_type,
            channel = %event.channel,
            path = %event.path,
            "dispatching event"
        );
        match event.event_type {
            EventType::Crash => self.send_crash(registry, event),
            EventType::Info => self.send_info(registry, event),
            EventType::Uptime => self.send_uptime(),
            EventType::Reboot => self.send_reboot(),
            EventType::Vm => self.sync_vm_events(registry),
            other => warn!(event_type = %other, "unsupported event type"),
        }
    }

    /// Quota gate over this sender's output tree.
    fn admit(&self) -> bool {
        space_available(&self.config.outdir, self.quota)
    }

    /// Record `INFO/SPACE_FULL` once per process.
    fn raise_space_full(&mut self) {
        if self.space_full_raised {
            debug!(outdir = %self.config.outdir.display(), "quota still exhausted");
            return;
        }
        self.space_full_raised = true;
        warn!(outdir = %self.config.outdir.display(), quota = self.quota, "sender quota exhausted");
        let key = self.ids.generate("INFO", SPACE_FULL);
        if let Err(e) = self.history.raise_info_error(SPACE_FULL, &key) {
            error!(error = %e, "failed to record SPACE_FULL");
        }
    }

    fn record(&mut self, record: HistoryRecord) {
        if let Err(e) = self.history.append(&record) {
            error!(
                category = %record.category,
                subject = %record.subject,
                error = %e,
                "failed to append history"
            );
        }
    }

    /// Collect every log id into `dir`, re-checking quota before each one.
    fn collect_logs(&mut self, registry: &ProbeConfig, log_ids: &[String], dir: &Path) {
        for id in log_ids {
            let Some(log) = registry.log(id) else {
                warn!(log = %id, "log source not configured, skipping");
                continue;
            };
            if !self.admit() {
                self.raise_space_full();
                return;
            }
            let collector = LogCollector::new(&self.runner, self.platform.as_ref());
            if let Err(e) = collector.collect(log, dir) {
                error!(log = %log.name, kind = %log.kind, error = %e, "log collection failed");
            }
        }
    }

    /// Copy the raw trigger file into `dir` under `name`.
    fn archive_trigger(&self, trigger_file: &Path, name: &str, dir: &Path) {
        let source = LogSource::new(name, LogKind::File, trigger_file.to_string_lossy());
        let collector = LogCollector::new(&self.runner, self.platform.as_ref());
        match collector.collect(&source, dir) {
            Ok(_) => info!(
                trigger = %trigger_file.display(),
                dir = %dir.display(),
                "trigger archived"
            ),
            Err(e) => error!(
                trigger = %trigger_file.display(),
                error = %e,
                "failed to archive trigger"
            ),
        }
    }
}
