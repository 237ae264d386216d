//! Guest history streams and how far each one has been synced.

use probe_config::VmConfig;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::history::HistoryError;

/// Source of not-yet-synced guest history lines.
pub trait VmHistorySource: Send {
    /// Event lines appended to `vm`'s stream since the previous call.
    fn new_lines(&mut self, vm: &VmConfig) -> Result<Vec<String>, HistoryError>;
}

/// Reads each guest's history file and remembers the consumed line count
/// per VM in a `<vm> <count>` bookkeeping file.
#[derive(Debug)]
pub struct FileVmHistory {
    record_path: PathBuf,
    synced: BTreeMap<String, usize>,
}

impl FileVmHistory {
    pub fn open(record_path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let record_path = record_path.into();
        let synced = match fs::read_to_string(&record_path) {
            Ok(content) => parse_records(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(HistoryError::Io {
                    path: record_path,
                    source: e,
                })
            }
        };
        Ok(Self {
            record_path,
            synced,
        })
    }

    pub fn record_path(&self) -> &Path {
        &self.record_path
    }

    pub fn synced(&self, vm: &str) -> usize {
        self.synced.get(vm).copied().unwrap_or(0)
    }

    fn persist(&self) -> Result<(), HistoryError> {
        let body: String = self
            .synced
            .iter()
            .map(|(vm, count)| format!("{vm} {count}\n"))
            .collect();
        fs::write(&self.record_path, body).map_err(|e| HistoryError::Io {
            path: self.record_path.clone(),
            source: e,
        })
    }
}

impl VmHistorySource for FileVmHistory {
    fn new_lines(&mut self, vm: &VmConfig) -> Result<Vec<String>, HistoryError> {
        let content = match fs::read_to_string(&vm.history_path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(
                    vm = %vm.name,
                    path = %vm.history_path.display(),
                    "guest history not present yet"
                );
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(HistoryError::Io {
                    path: vm.history_path.clone(),
                    source: e,
                })
            }
        };

        let events: Vec<&str> = content.lines().filter(|l| is_event_line(l)).collect();
        let mut start = self.synced(&vm.name);
        if start > events.len() {
            warn!(
                vm = %vm.name,
                synced = start,
                available = events.len(),
                "guest history shrank, resyncing"
            );
            start = 0;
        }

        let fresh: Vec<String> = events[start..].iter().map(|l| l.to_string()).collect();
        self.synced.insert(vm.name.clone(), events.len());
        self.persist()?;
        Ok(fresh)
    }
}

fn is_event_line(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && !line.starts_with('#') && !line.starts_with("VERSION")
}

fn parse_records(content: &str) -> BTreeMap<String, usize> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let vm = fields.next()?;
            let count = fields.next()?.parse().ok()?;
            Some((vm.to_string(), count))
        })
        .collect()
}
