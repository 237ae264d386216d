//! Configuration loading + validation tests against real JSON files.

use probe_config::{
    load_config, ConfigError, LogKind, ReclassifyKind, TriggerKind, ValidationError,
    CONFIG_SCHEMA_VERSION,
};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &TempDir, value: serde_json::Value) -> PathBuf {
    let path = dir.path().join("probe.json");
    fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    path
}

fn base_config() -> serde_json::Value {
    json!({
        "schema_version": CONFIG_SCHEMA_VERSION,
        "logs": [
            {"name": "kmsg", "type": "node", "path": "/dev/kmsg"},
            {"name": "syslog", "type": "file", "path": "/var/log/syslog", "tail_lines": "500"},
            {"name": "hvlog", "type": "file_rotation", "path": "/tmp/hvlog/hvlog_cur.[biggest]"},
            {"name": "acrnlog", "type": "cmd", "path": "acrnctl list"}
        ],
        "crashes": [{
            "name": "IPANIC",
            "trigger": {"type": "dir", "path": "/var/crash"},
            "reclassify": "content_match",
            "variants": [
                {"name": "IPANIC_OOPS", "content": ["Oops"], "data": ["RIP:"], "logs": ["hvlog"]}
            ],
            "logs": ["kmsg", "syslog"]
        }],
        "infos": [{"name": "BOOT_LOGS", "logs": ["acrnlog"]}],
        "senders": [{
            "name": "crashlog",
            "outdir": "/var/log/crashlog",
            "spacequota": "104857600",
            "uptime": {"path": "/var/log/crashlog/uptime", "frequency": "5"}
        }],
        "vms": [{"name": "VM1", "history_path": "/data/vm1/history_event"}]
    })
}

#[test]
fn full_config_loads() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, base_config());

    let config = load_config(&path).expect("config loads");
    assert_eq!(config.logs.len(), 4);
    assert_eq!(config.log("hvlog").unwrap().kind, LogKind::FileRotation);
    assert_eq!(config.log("syslog").unwrap().tail_limit(), Some(500));

    let crash = config.crash("IPANIC").unwrap();
    assert_eq!(crash.trigger.kind, TriggerKind::Dir);
    assert_eq!(crash.reclassify, ReclassifyKind::ContentMatch);
    assert_eq!(crash.variants[0].name, "IPANIC_OOPS");

    let sender = config.sender("crashlog").unwrap();
    assert_eq!(sender.quota_bytes(), Some(104_857_600));
    assert!(sender.vm_record_path.is_none());
    assert_eq!(
        config.crashlog_outdir(),
        Some(std::path::Path::new("/var/log/crashlog"))
    );
}

#[test]
fn unknown_log_reference_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut value = base_config();
    value["crashes"][0]["logs"] = json!(["kmsg", "missing"]);
    let path = write_config(&dir, value);

    match load_config(&path) {
        Err(ConfigError::Validation(ValidationError::UnknownLog { log, .. })) => {
            assert_eq!(log, "missing")
        }
        other => panic!("expected UnknownLog, got {other:?}"),
    }
}

#[test]
fn malformed_rotation_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut value = base_config();
    value["logs"][2]["path"] = json!("/tmp/hvlog/hvlog_cur.[biggest");
    let path = write_config(&dir, value);

    let err = load_config(&path).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Validation(ValidationError::BadRotation { .. })
    ));
}

#[test]
fn bad_quota_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut value = base_config();
    value["senders"][0]["spacequota"] = json!("100MB");
    let path = write_config(&dir, value);

    let err = load_config(&path).unwrap_err();
    match err {
        ConfigError::Validation(e) => assert_eq!(e.code(), 63),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn duplicate_sender_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut value = base_config();
    let sender = value["senders"][0].clone();
    value["senders"].as_array_mut().unwrap().push(sender);
    let path = write_config(&dir, value);

    assert!(matches!(
        load_config(&path),
        Err(ConfigError::Validation(ValidationError::DuplicateName {
            section: "sender",
            ..
        }))
    ));
}

#[test]
fn version_mismatch_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut value = base_config();
    value["schema_version"] = json!("0.9.0");
    let path = write_config(&dir, value);

    assert!(matches!(
        load_config(&path),
        Err(ConfigError::VersionMismatch { .. })
    ));
}

#[test]
fn missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = load_config(&dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, ConfigError::IoError { .. }));
}
