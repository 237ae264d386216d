//! Crash pipeline: reclassify, key, directory, logs, trigger, history.

use probe_config::ProbeConfig;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::CrashlogSender;
use crate::classify::CrashSpec;
use crate::crashfile::Descriptor;
use crate::event::{EventPayload, EventRecord};
use crate::history::HistoryRecord;
use crate::logdir::DirMode;

impl CrashlogSender {
    pub(super) fn send_crash(&mut self, registry: &ProbeConfig, event: &mut EventRecord) {
        let Some(spec) = event.crash_spec().cloned() else {
            warn!(path = %event.path, "crash event without crash payload");
            return;
        };

        let trigger_file = spec.trigger.resolve(&event.path);
        let refined = match CrashSpec::reclassify(&spec, &trigger_file) {
            Ok(r) => r,
            Err(e) => {
                error!(
                    crash = %spec.name,
                    trigger = %trigger_file.display(),
                    error = %e,
                    "reclassify failed"
                );
                return;
            }
        };
        event.payload = EventPayload::Crash(Arc::clone(&refined.spec));
        let crash = refined.spec;

        let key = self.ids.generate("CRASH", &crash.name);

        if crash.collects_logs() || event.channel.is_fs_watch() {
            let dir = match self.dirs.allocate(DirMode::Crash, &key) {
                Ok(dir) => dir,
                Err(e) => {
                    error!(crash = %crash.name, error = %e, "failed to allocate crash directory");
                    return;
                }
            };
            event.dir = Some(dir.clone());

            if let Err(e) = Descriptor::new("CRASH", &key, &crash.name)
                .with_data(&refined.data)
                .write(&dir)
            {
                error!(dir = %dir.display(), error = %e, "failed to write crash descriptor");
            }

            self.collect_logs(registry, &crash.logs, &dir);

            if !self.admit() {
                self.raise_space_full();
            } else if event.channel.is_fs_watch() {
                let name = archive_name(&event.path, &trigger_file);
                self.archive_trigger(&trigger_file, &name, &dir);
            }
        }

        info!(crash = %crash.name, key = %key, dir = ?event.dir, "crash handled");
        let record = HistoryRecord::new("CRASH", crash.name.as_str(), key);
        self.record(record.with_dir(event.dir.clone()));
    }
}

/// Name the archived trigger takes inside the evidence directory.
fn archive_name(relative: &str, trigger_file: &std::path::Path) -> String {
    if !relative.is_empty() {
        return relative.to_string();
    }
    trigger_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trigger".to_string())
}
