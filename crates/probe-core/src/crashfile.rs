//! The `crashfile` descriptor written into each evidence directory.

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logdir::LogDirError;

pub const DESCRIPTOR_FILE: &str = "crashfile";

/// Timestamp layout shared by descriptors and history lines.
pub const DATE_FORMAT: &str = "%Y-%m-%d/%H:%M:%S";

/// Ordered `KEY=value` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    entries: Vec<(String, String)>,
}

impl Descriptor {
    /// `EVENT`, `ID`, `DATE` and `TYPE`, dated now.
    pub fn new(event: &str, key: &str, kind: &str) -> Self {
        Self::dated(event, key, kind, Local::now())
    }

    pub fn dated(event: &str, key: &str, kind: &str, at: DateTime<Local>) -> Self {
        let mut d = Self {
            entries: Vec::with_capacity(8),
        };
        d.push("EVENT", event);
        d.push("ID", key);
        d.push("DATE", &at.format(DATE_FORMAT).to_string());
        d.push("TYPE", kind);
        d
    }

    pub fn with(mut self, field: &str, value: &str) -> Self {
        self.push(field, value);
        self
    }

    /// `DATA0..` for the non-empty auxiliary strings, keeping positions.
    pub fn with_data(mut self, data: &[String]) -> Self {
        for (i, value) in data.iter().enumerate() {
            if !value.is_empty() {
                self.push(&format!("DATA{i}"), value);
            }
        }
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{k}={v}\n"))
            .collect()
    }

    /// Write `<dir>/crashfile`.
    pub fn write(&self, dir: &Path) -> Result<PathBuf, LogDirError> {
        let path = dir.join(DESCRIPTOR_FILE);
        fs::write(&path, self.render()).map_err(|e| LogDirError::Descriptor {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    fn push(&mut self, field: &str, value: &str) {
        // Values are single-line by construction of the file format.
        let value = value.replace(['\n', '\r'], " ");
        self.entries.push((field.to_string(), value));
    }
}
