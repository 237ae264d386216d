//! Crash probe configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the log, crash, info, sender and VM descriptors
//! - Config resolution (CLI → env → XDG)
//! - Semantic validation (cross references, rotation syntax, quotas)
//! - The rotation-selector parser shared with the collection engine

pub mod model;
pub mod resolve;
pub mod rotation;
pub mod validate;

pub use model::{
    CrashDescriptor, CrashVariant, InfoSpec, LogKind, LogSource, PlatformConfig, ProbeConfig,
    ReclassifyKind, SenderConfig, Trigger, TriggerKind, UptimeProbe, VmConfig,
};
pub use resolve::{resolve_config, ConfigSource, ResolvedPath};
pub use rotation::{RotationError, RotationPattern, Selector};
pub use validate::{validate_config, ValidationError};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Name of the sender that owns the event pipelines.
pub const CRASHLOG_SENDER: &str = "crashlog";

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found (tried CLI, PROBE_CONFIG and XDG config home)")]
    NotFound,

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },

    #[error("Semantic validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Load, version-check and validate a configuration file.
pub fn load_config(path: &Path) -> Result<ProbeConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: ProbeConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(ConfigError::VersionMismatch {
            expected: CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    validate_config(&config)?;
    Ok(config)
}

/// Resolve the config path and load it.
pub fn load_resolved(cli_path: Option<&Path>) -> Result<(ProbeConfig, ResolvedPath), ConfigError> {
    let resolved = resolve_config(cli_path).ok_or(ConfigError::NotFound)?;
    let config = load_config(&resolved.path)?;
    Ok((config, resolved))
}
