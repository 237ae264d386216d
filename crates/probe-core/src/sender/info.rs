use probe_config::ProbeConfig;
use tracing::{error, info, warn};

use super::CrashlogSender;
use crate::event::EventRecord;
use crate::history::HistoryRecord;
use crate::logdir::DirMode;

impl CrashlogSender {
    pub(super) fn send_info(&mut self, registry: &ProbeConfig, event: &mut EventRecord) {
        let Some(spec) = event.info_spec().cloned() else {
            warn!("info event without info payload");
            return;
        };

        let key = self.ids.generate("INFO", &spec.name);

        if spec.collects_logs() {
            let dir = match self.dirs.allocate(DirMode::Stats, &key) {
                Ok(dir) => dir,
                Err(e) => {
                    error!(info = %spec.name, error = %e, "failed to allocate stats directory");
                    return;
                }
            };
            event.dir = Some(dir.clone());
            self.collect_logs(registry, &spec.logs, &dir);
        }

        info!(info = %spec.name, key = %key, dir = ?event.dir, "info handled");
        let record = HistoryRecord::new("INFO", spec.name.as_str(), key);
        self.record(record.with_dir(event.dir.clone()));
    }
}
