//! Shared fakes for integration tests.

#![allow(dead_code)]

use probe_config::{
    CrashDescriptor, InfoSpec, LogKind, LogSource, ProbeConfig, SenderConfig, Trigger, TriggerKind,
    VmConfig, CONFIG_SCHEMA_VERSION,
};
use probe_core::eventid::EventIdGenerator;
use probe_core::history::{HistoryError, HistoryRecord, HistoryStore};
use probe_core::platform::{Platform, PlatformError};
use probe_core::sender::CrashlogSender;
use probe_core::vm_history::VmHistorySource;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// History store that keeps records in memory behind a shared handle.
#[derive(Clone, Default)]
pub struct RecordingHistory {
    records: Arc<Mutex<Vec<HistoryRecord>>>,
}

impl RecordingHistory {
    pub fn records(&self) -> Vec<HistoryRecord> {
        self.records.lock().unwrap().clone()
    }

    /// `(category, subject)` pairs in append order.
    pub fn summary(&self) -> Vec<(String, String)> {
        self.records()
            .into_iter()
            .map(|r| (r.category, r.subject))
            .collect()
    }
}

impl HistoryStore for RecordingHistory {
    fn append(&mut self, record: &HistoryRecord) -> Result<(), HistoryError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Deterministic keys; remembers what they were derived from.
#[derive(Clone, Default)]
pub struct RecordingIds {
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingIds {
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl EventIdGenerator for RecordingIds {
    fn generate(&self, category: &str, name: &str) -> String {
        let mut calls = self.calls.lock().unwrap();
        calls.push((category.to_string(), name.to_string()));
        format!("key{:04}", calls.len())
    }
}

/// Platform with canned answers and a log of guest extraction requests.
pub struct FakePlatform {
    pub uptime: Duration,
    pub swupdated: Result<bool, ()>,
    pub reason: String,
    pub fail_properties: bool,
    pub extractions: Mutex<Vec<(String, PathBuf)>>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            uptime: Duration::from_secs(3723),
            swupdated: Ok(false),
            reason: "WATCHDOG".to_string(),
            fail_properties: false,
            extractions: Mutex::new(Vec::new()),
        }
    }
}

impl FakePlatform {
    pub fn extractions(&self) -> Vec<(String, PathBuf)> {
        self.extractions.lock().unwrap().clone()
    }
}

impl Platform for FakePlatform {
    fn uptime(&self) -> Result<Duration, PlatformError> {
        Ok(self.uptime)
    }

    fn init_properties(&self, sender: &SenderConfig) -> Result<(), PlatformError> {
        if self.fail_properties {
            return Err(PlatformError::Io {
                path: sender.outdir.join("properties"),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        Ok(())
    }

    fn swupdated(&self, sender: &SenderConfig) -> Result<bool, PlatformError> {
        self.swupdated.map_err(|_| PlatformError::Io {
            path: sender.outdir.join("lastbuild"),
            source: std::io::Error::from(std::io::ErrorKind::InvalidData),
        })
    }

    fn startup_reason(&self) -> String {
        self.reason.clone()
    }

    fn extract_guest_logs(&self, guest_path: &str, dest: &Path) -> Result<(), PlatformError> {
        self.extractions
            .lock()
            .unwrap()
            .push((guest_path.to_string(), dest.to_path_buf()));
        let _ = fs::write(dest.join("extracted"), guest_path);
        Ok(())
    }
}

/// Guest history lines served from memory, drained on read.
#[derive(Default)]
pub struct StaticVmHistory {
    pub pending: HashMap<String, Vec<String>>,
}

impl StaticVmHistory {
    pub fn with_lines(vm: &str, lines: &[&str]) -> Self {
        let mut pending = HashMap::new();
        pending.insert(vm.to_string(), lines.iter().map(|l| l.to_string()).collect());
        Self { pending }
    }
}

impl VmHistorySource for StaticVmHistory {
    fn new_lines(&mut self, vm: &VmConfig) -> Result<Vec<String>, HistoryError> {
        Ok(self.pending.remove(&vm.name).unwrap_or_default())
    }
}

/// A crashlog sender over a temp output tree, wired to recording fakes.
pub struct Harness {
    pub root: TempDir,
    pub outdir: PathBuf,
    pub history: RecordingHistory,
    pub ids: RecordingIds,
    pub platform: Arc<FakePlatform>,
    pub sender: CrashlogSender,
}

pub fn harness(quota: u64) -> Harness {
    harness_with(quota, FakePlatform::default())
}

pub fn harness_with(quota: u64, platform: FakePlatform) -> Harness {
    build(quota, platform, None)
}

/// Harness whose sender syncs guest history from `source`.
pub fn harness_vm(quota: u64, source: StaticVmHistory) -> Harness {
    build(quota, FakePlatform::default(), Some(Box::new(source)))
}

fn build(
    quota: u64,
    platform: FakePlatform,
    vm_history: Option<Box<dyn VmHistorySource>>,
) -> Harness {
    let root = TempDir::new().unwrap();
    let outdir = root.path().join("out");
    fs::create_dir_all(&outdir).unwrap();

    let history = RecordingHistory::default();
    let ids = RecordingIds::default();
    let platform = Arc::new(platform);
    let config = SenderConfig::new("crashlog", &outdir, quota);

    let mut sender = CrashlogSender::new(
        config,
        quota,
        Arc::clone(&platform) as Arc<dyn Platform>,
        Box::new(history.clone()),
    )
    .with_event_ids(Box::new(ids.clone()));
    if let Some(source) = vm_history {
        sender = sender.with_vm_history(source);
    }

    Harness {
        root,
        outdir,
        history,
        ids,
        platform,
        sender,
    }
}

impl Harness {
    /// Write a file under the harness root, creating parents.
    pub fn file(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Directories allocated under the output tree, sorted.
    pub fn evidence_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<_> = fs::read_dir(&self.outdir)
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        dirs
    }
}

/// Empty registry at the current schema version.
pub fn registry() -> ProbeConfig {
    ProbeConfig {
        schema_version: CONFIG_SCHEMA_VERSION.to_string(),
        ..Default::default()
    }
}

pub fn file_log(name: &str, path: &Path) -> LogSource {
    LogSource::new(name, LogKind::File, path.to_string_lossy())
}

pub fn crash(name: &str, kind: TriggerKind, path: &Path, logs: &[&str]) -> CrashDescriptor {
    CrashDescriptor {
        name: name.to_string(),
        trigger: Trigger {
            kind,
            path: path.to_path_buf(),
        },
        reclassify: Default::default(),
        data: vec![],
        variants: vec![],
        logs: logs.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn info(name: &str, logs: &[&str]) -> InfoSpec {
    InfoSpec {
        name: name.to_string(),
        logs: logs.iter().map(|s| s.to_string()).collect(),
    }
}
