//! Append-only history of handled events.
//!
//! One line per record, columns padded and separated by at least two
//! spaces: category, key, date, type, evidence directory. A new file starts
//! with a `VERSION` line and a `#` column header, the same layout guests
//! use for their own history streams.

use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::trace;

use crate::crashfile::DATE_FORMAT;

pub const HISTORY_FILE: &str = "history_event";
pub const HISTORY_VERSION: &str = "VERSION 1.0";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("I/O error on history {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One audit line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    /// `CRASH`, `INFO`, `REBOOT`, `UPTIME` or a VM name.
    pub category: String,
    pub subject: String,
    pub dir: Option<PathBuf>,
    /// Accepted for compatibility, written only when non-empty.
    pub reserved: String,
    pub key: String,
    pub at: DateTime<Local>,
}

impl HistoryRecord {
    pub fn new(
        category: impl Into<String>,
        subject: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            subject: subject.into(),
            dir: None,
            reserved: String::new(),
            key: key.into(),
            at: Local::now(),
        }
    }

    pub fn with_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.dir = dir;
        self
    }

    pub fn to_line(&self) -> String {
        let dir = self
            .dir
            .as_deref()
            .map(|d| d.display().to_string())
            .unwrap_or_default();
        let date = self.at.format(DATE_FORMAT).to_string();
        format_columns(&[
            self.category.as_str(),
            self.key.as_str(),
            date.as_str(),
            self.subject.as_str(),
            dir.as_str(),
            self.reserved.as_str(),
        ])
    }
}

fn format_columns(cols: &[&str; 6]) -> String {
    let line = format!(
        "{:<8}  {:<20}  {:<19}  {:<16}  {}  {}",
        cols[0], cols[1], cols[2], cols[3], cols[4], cols[5]
    );
    line.trim_end().to_string()
}

/// Destination for history records. Appends are serialized by `&mut self`.
pub trait HistoryStore: Send {
    fn append(&mut self, record: &HistoryRecord) -> Result<(), HistoryError>;

    /// Bare uptime marker, the label in the type column.
    fn raise_uptime(&mut self, label: &str) -> Result<(), HistoryError> {
        self.append(&HistoryRecord::new("UPTIME", label, ""))
    }

    /// `INFO/<name>` record without evidence.
    fn raise_info_error(&mut self, name: &str, key: &str) -> Result<(), HistoryError> {
        self.append(&HistoryRecord::new("INFO", name, key))
    }
}

/// File-backed history at `<outdir>/history_event`.
pub struct HistoryLog {
    path: PathBuf,
    writer: BufWriter<File>,
    records: u64,
}

impl HistoryLog {
    /// Open for append, writing the header when the file is new or empty.
    pub fn open(outdir: &Path) -> Result<Self, HistoryError> {
        let path = outdir.join(HISTORY_FILE);
        let io_err = |e| HistoryError::Io {
            path: path.clone(),
            source: e,
        };

        let fresh = std::fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        let mut writer = BufWriter::new(file);

        if fresh {
            let header = format_columns(&["#EVENT", "ID", "DATE", "TYPE", "DIR", ""]);
            writeln!(writer, "{HISTORY_VERSION}").map_err(io_err)?;
            writeln!(writer, "{header}").map_err(io_err)?;
            writer.flush().map_err(io_err)?;
        }

        Ok(Self {
            path,
            writer,
            records: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended through this handle.
    pub fn records(&self) -> u64 {
        self.records
    }
}

impl HistoryStore for HistoryLog {
    fn append(&mut self, record: &HistoryRecord) -> Result<(), HistoryError> {
        let line = record.to_line();
        writeln!(self.writer, "{line}")
            .and_then(|_| self.writer.flush())
            .map_err(|e| HistoryError::Io {
                path: self.path.clone(),
                source: e,
            })?;
        self.records += 1;
        trace!(category = %record.category, subject = %record.subject, "history appended");
        Ok(())
    }
}
