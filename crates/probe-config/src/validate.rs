//! Semantic validation of a loaded configuration.

use std::collections::HashSet;
use thiserror::Error;

use crate::model::{LogKind, ProbeConfig};
use crate::rotation::{RotationError, RotationPattern};
use crate::CRASHLOG_SENDER;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("duplicate {section} name: {name}")]
    DuplicateName { section: &'static str, name: String },

    #[error("{owner} references unknown log {log:?}")]
    UnknownLog { owner: String, log: String },

    #[error("log {log:?}: {source}")]
    BadRotation {
        log: String,
        #[source]
        source: RotationError,
    },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("crash {crash:?}: variant {variant:?} declares more than three data markers")]
    TooManyDataMarkers { crash: String, variant: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::DuplicateName { .. } => 60,
            ValidationError::UnknownLog { .. } => 61,
            ValidationError::BadRotation { .. } => 62,
            ValidationError::InvalidValue { .. } => 63,
            ValidationError::TooManyDataMarkers { .. } => 64,
        }
    }
}

fn unique<'a>(
    section: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ValidationError::DuplicateName {
                section,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn check_refs(config: &ProbeConfig, owner: &str, logs: &[String]) -> Result<(), ValidationError> {
    for log in logs {
        if config.log(log).is_none() {
            return Err(ValidationError::UnknownLog {
                owner: owner.to_string(),
                log: log.clone(),
            });
        }
    }
    Ok(())
}

/// Validate cross references and string-encoded values.
pub fn validate_config(config: &ProbeConfig) -> Result<(), ValidationError> {
    unique("log", config.logs.iter().map(|l| l.name.as_str()))?;
    unique("crash", config.crashes.iter().map(|c| c.name.as_str()))?;
    unique("info", config.infos.iter().map(|i| i.name.as_str()))?;
    unique("sender", config.senders.iter().map(|s| s.name.as_str()))?;
    unique("vm", config.vms.iter().map(|v| v.name.as_str()))?;

    for log in &config.logs {
        if log.kind == LogKind::FileRotation {
            RotationPattern::parse(&log.path).map_err(|source| ValidationError::BadRotation {
                log: log.name.clone(),
                source,
            })?;
        }
    }

    for crash in &config.crashes {
        check_refs(config, &format!("crash {:?}", crash.name), &crash.logs)?;
        if crash.data.len() > 3 {
            return Err(ValidationError::TooManyDataMarkers {
                crash: crash.name.clone(),
                variant: crash.name.clone(),
            });
        }
        for variant in &crash.variants {
            check_refs(config, &format!("crash variant {:?}", variant.name), &variant.logs)?;
            if variant.data.len() > 3 {
                return Err(ValidationError::TooManyDataMarkers {
                    crash: crash.name.clone(),
                    variant: variant.name.clone(),
                });
            }
        }
    }

    for info in &config.infos {
        check_refs(config, &format!("info {:?}", info.name), &info.logs)?;
    }

    for sender in &config.senders {
        if sender.quota_bytes().is_none() {
            return Err(ValidationError::InvalidValue {
                field: format!("senders.{}.spacequota", sender.name),
                message: format!("{:?} is not a byte count", sender.spacequota),
            });
        }
        if let Some(uptime) = &sender.uptime {
            if uptime.frequency_secs().is_none() {
                return Err(ValidationError::InvalidValue {
                    field: format!("senders.{}.uptime.frequency", sender.name),
                    message: format!("{:?} is not a number of seconds", uptime.frequency),
                });
            }
        }
    }

    if !config.vms.is_empty() && config.sender(CRASHLOG_SENDER).is_none() {
        return Err(ValidationError::InvalidValue {
            field: "vms".to_string(),
            message: format!("VM sync requires a {CRASHLOG_SENDER:?} sender"),
        });
    }

    Ok(())
}
