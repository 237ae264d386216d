//! Guest VM event sync.
//!
//! Each guest keeps its own history stream in the host-visible layout:
//!
//! ```text
//! CRASH   <vm_key>  2017-11-11/03:12:59  JAVACRASH  /data/logs/crashlog0_<vm_key>
//! REBOOT  <vm_key>  2011-11-11/11:20:51  POWER-ON   0000:00:00
//! ```
//!
//! Every new line becomes a `vmevent_<key>` directory on the host, with the
//! guest's log directory pulled out of its disk image when the line names one.

use probe_config::{ProbeConfig, VmConfig};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, error, warn};

use super::CrashlogSender;
use crate::crashfile::Descriptor;
use crate::history::HistoryRecord;
use crate::logdir::DirMode;

const GUEST_LOG_MARKER: &str = "/logs/";

fn line_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\S+)\s+(\S+)\s+(\S+)\s+(\S+)\s+(.*\S)\s*$").ok())
        .as_ref()
}

/// One parsed guest history line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmEventLine {
    pub event: String,
    pub vm_key: String,
    pub timestamp: String,
    pub subtype: String,
    /// Everything after the fourth field, inner whitespace preserved.
    pub remainder: String,
}

impl VmEventLine {
    /// Split into exactly five fields; anything shorter is rejected.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = line_pattern()?.captures(line.trim_start())?;
        let field = |i: usize| caps.get(i).map(|m| m.as_str().to_string());
        Some(Self {
            event: field(1)?,
            vm_key: field(2)?,
            timestamp: field(3)?,
            subtype: field(4)?,
            remainder: field(5)?,
        })
    }

    /// Guest-relative log path, `logs/...`, when the remainder names one.
    pub fn guest_log_path(&self) -> Option<&str> {
        self.remainder
            .find(GUEST_LOG_MARKER)
            .map(|at| &self.remainder[at + 1..])
    }
}

impl CrashlogSender {
    /// Process every guest line appended since the previous sync.
    pub(super) fn sync_vm_events(&mut self, registry: &ProbeConfig) {
        let Some(mut source) = self.vm_history.take() else {
            debug!("no vm history source configured");
            return;
        };
        for vm in &registry.vms {
            match source.new_lines(vm) {
                Ok(lines) => {
                    debug!(vm = %vm.name, lines = lines.len(), "vm history refreshed");
                    for line in lines {
                        self.send_vm_event(vm, &line);
                    }
                }
                Err(e) => error!(vm = %vm.name, error = %e, "vm history refresh failed"),
            }
        }
        self.vm_history = Some(source);
    }

    fn send_vm_event(&mut self, vm: &VmConfig, line: &str) {
        let Some(event) = VmEventLine::parse(line) else {
            warn!(vm = %vm.name, line, "malformed vm history line, skipped");
            return;
        };

        if !self.admit() {
            self.raise_space_full();
            return;
        }

        let key = self.ids.generate("SOS", &event.vm_key);
        let dir = match self.dirs.allocate(DirMode::VmEvent, &key) {
            Ok(dir) => dir,
            Err(e) => {
                error!(vm = %vm.name, error = %e, "failed to allocate vm event directory");
                return;
            }
        };

        if let Some(guest_path) = event.guest_log_path() {
            if let Err(e) = self.platform.extract_guest_logs(guest_path, &dir) {
                error!(vm = %vm.name, guest_path, error = %e, "guest log extraction failed");
            }
        }

        if let Err(e) = Descriptor::new(&event.event, &key, &event.subtype)
            .with("DATA0", &vm.name)
            .with("DATA1", &event.vm_key)
            .with("VMTIME", &event.timestamp)
            .with("VMDATA", &event.remainder)
            .write(&dir)
        {
            error!(dir = %dir.display(), error = %e, "failed to write vm event descriptor");
        }

        self.record(HistoryRecord::new(vm.name.as_str(), event.subtype, key).with_dir(Some(dir)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crash_line_parses_into_five_fields() {
        let line = "CRASH DEADBEEF00000000000 2020-01-01/00:00:00 JAVACRASH /data/logs/foo/bar.txt";
        let ev = VmEventLine::parse(line).unwrap();
        assert_eq!(ev.event, "CRASH");
        assert_eq!(ev.vm_key, "DEADBEEF00000000000");
        assert_eq!(ev.timestamp, "2020-01-01/00:00:00");
        assert_eq!(ev.subtype, "JAVACRASH");
        assert_eq!(ev.remainder, "/data/logs/foo/bar.txt");
        assert_eq!(ev.guest_log_path(), Some("logs/foo/bar.txt"));
    }

    #[test]
    fn remainder_keeps_inner_spaces() {
        let ev =
            VmEventLine::parse("INFO  k  2020-01-01/00:00:00  NOTE  some free text  \n").unwrap();
        assert_eq!(ev.remainder, "some free text");
        assert_eq!(ev.guest_log_path(), None);
    }

    #[test]
    fn short_lines_are_rejected() {
        assert!(VmEventLine::parse("REBOOT k 2020-01-01/00:00:00 POWER-ON").is_none());
        assert!(VmEventLine::parse("").is_none());
        assert!(VmEventLine::parse("   ").is_none());
    }
}
