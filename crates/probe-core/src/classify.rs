//! Crash reclassification.
//!
//! A crash descriptor names a family; the family's [`Reclassify`]
//! implementation inspects the trigger file and returns the refined crash
//! type for the remainder of one event's handling.

use probe_config::{CrashDescriptor, CrashVariant, ReclassifyKind, Trigger};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Most auxiliary strings a crash can carry.
pub const MAX_AUX_DATA: usize = 3;

/// Upper bound on how much of a trigger file is scanned for markers.
pub const CONTENT_SCAN_LIMIT: u64 = 4 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("cannot read trigger {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Runtime crash type, bound to its family's classifier.
#[derive(Debug, Clone)]
pub struct CrashSpec {
    pub name: String,
    pub trigger: Trigger,
    /// Ids of the log sources collected for this crash.
    pub logs: Vec<String>,
    /// Markers whose line remainder becomes auxiliary data.
    pub data: Vec<String>,
    pub variants: Vec<CrashVariant>,
    pub reclassifier: Arc<dyn Reclassify>,
}

impl CrashSpec {
    pub fn from_descriptor(desc: &CrashDescriptor) -> Self {
        let reclassifier: Arc<dyn Reclassify> = match desc.reclassify {
            ReclassifyKind::Passthrough => Arc::new(Passthrough),
            ReclassifyKind::ContentMatch => Arc::new(ContentMatch::default()),
        };
        Self {
            name: desc.name.clone(),
            trigger: desc.trigger.clone(),
            logs: desc.logs.clone(),
            data: desc.data.clone(),
            variants: desc.variants.clone(),
            reclassifier,
        }
    }

    pub fn collects_logs(&self) -> bool {
        !self.logs.is_empty()
    }

    /// Run this crash's own classifier.
    pub fn reclassify(
        spec: &Arc<Self>,
        trigger_file: &Path,
    ) -> Result<Reclassified, ClassifyError> {
        spec.reclassifier.reclassify(spec, trigger_file)
    }
}

/// Outcome of a successful reclassification.
#[derive(Debug, Clone)]
pub struct Reclassified {
    pub spec: Arc<CrashSpec>,
    /// Positional auxiliary strings, at most [`MAX_AUX_DATA`]; missing
    /// values are empty.
    pub data: Vec<String>,
}

/// Crash-family-specific refinement of a raw trigger.
pub trait Reclassify: Send + Sync + fmt::Debug {
    fn reclassify(&self, spec: &Arc<CrashSpec>, trigger_file: &Path)
        -> Result<Reclassified, ClassifyError>;
}

/// Keeps the configured crash as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Reclassify for Passthrough {
    fn reclassify(
        &self,
        spec: &Arc<CrashSpec>,
        _trigger_file: &Path,
    ) -> Result<Reclassified, ClassifyError> {
        Ok(Reclassified {
            spec: Arc::clone(spec),
            data: Vec::new(),
        })
    }
}

/// Picks the first variant whose literal markers all occur in the trigger.
#[derive(Debug, Clone, Copy)]
pub struct ContentMatch {
    pub scan_limit: u64,
}

impl Default for ContentMatch {
    fn default() -> Self {
        Self {
            scan_limit: CONTENT_SCAN_LIMIT,
        }
    }
}

impl ContentMatch {
    fn read_trigger(&self, path: &Path) -> Result<String, ClassifyError> {
        let read_err = |e| ClassifyError::Read {
            path: path.to_path_buf(),
            source: e,
        };
        let mut buf = Vec::new();
        File::open(path)
            .map_err(read_err)?
            .take(self.scan_limit)
            .read_to_end(&mut buf)
            .map_err(read_err)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl Reclassify for ContentMatch {
    fn reclassify(
        &self,
        spec: &Arc<CrashSpec>,
        trigger_file: &Path,
    ) -> Result<Reclassified, ClassifyError> {
        let content = self.read_trigger(trigger_file)?;

        let hit = spec
            .variants
            .iter()
            .find(|v| {
                !v.content.is_empty() && v.content.iter().all(|m| content.contains(m.as_str()))
            });

        let refined = match hit {
            Some(variant) => {
                debug!(parent = %spec.name, variant = %variant.name, "crash reclassified");
                Arc::new(refine(spec, variant))
            }
            None => Arc::clone(spec),
        };
        let data = extract_data(&content, &refined.data);
        Ok(Reclassified {
            spec: refined,
            data,
        })
    }
}

/// Child spec inheriting the parent's trigger, with logs appended.
fn refine(parent: &CrashSpec, variant: &CrashVariant) -> CrashSpec {
    let mut logs = parent.logs.clone();
    for id in &variant.logs {
        if !logs.contains(id) {
            logs.push(id.clone());
        }
    }
    CrashSpec {
        name: variant.name.clone(),
        trigger: parent.trigger.clone(),
        logs,
        data: if variant.data.is_empty() {
            parent.data.clone()
        } else {
            variant.data.clone()
        },
        variants: Vec::new(),
        reclassifier: Arc::clone(&parent.reclassifier),
    }
}

/// For each marker, the trimmed remainder of the first line containing it.
fn extract_data(content: &str, markers: &[String]) -> Vec<String> {
    markers
        .iter()
        .take(MAX_AUX_DATA)
        .map(|marker| {
            content
                .lines()
                .find_map(|line| {
                    line.find(marker.as_str())
                        .map(|at| line[at + marker.len()..].trim().to_string())
                })
                .unwrap_or_default()
        })
        .collect()
}
