//! Uptime and reboot markers.

use tracing::{error, info, warn};

use super::CrashlogSender;
use crate::collect::uptime_label;
use crate::history::HistoryRecord;

impl CrashlogSender {
    pub(super) fn send_uptime(&mut self) {
        let label = match self.platform.uptime() {
            Ok(uptime) => uptime_label(uptime),
            Err(e) => {
                warn!(error = %e, "cannot read uptime, marker skipped");
                return;
            }
        };
        if let Err(e) = self.history.raise_uptime(&label) {
            error!(error = %e, "failed to record uptime");
        }
    }

    /// Software-update marker then startup reason; each step stands alone.
    pub(super) fn send_reboot(&mut self) {
        match self.platform.swupdated(&self.config) {
            Ok(true) => {
                let key = self.ids.generate("INFO", "SWUPDATE");
                self.record(HistoryRecord::new("INFO", "SWUPDATE", key));
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "cannot determine software update state"),
        }

        let reason = self.platform.startup_reason();
        let key = self.ids.generate("REBOOT", &reason);
        info!(reason = %reason, "reboot recorded");
        self.record(HistoryRecord::new("REBOOT", reason, key));
    }
}
