//! Host capabilities the pipelines call out to.
//!
//! The [`Platform`] trait is the seam; [`SystemPlatform`] is the default
//! implementation backed by `/proc`, a few bookkeeping files under the
//! sender's output directory, and `debugfs` for guest image extraction.

use probe_config::{PlatformConfig, SenderConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collect::tool_runner::{ToolError, ToolRunner, ToolSpec};

/// Reported when no startup reason can be read.
pub const UNKNOWN_REASON: &str = "UNKNOWN";

const PROC_UPTIME: &str = "/proc/uptime";
const PROPERTIES_FILE: &str = "properties";
const LASTBUILD_FILE: &str = "lastbuild";
const DEFAULT_DEBUGFS: &str = "debugfs";

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed uptime in {path}: {content:?}")]
    Uptime { path: PathBuf, content: String },

    #[error("guest log extraction failed: {0}")]
    Extract(#[from] ToolError),

    #[error("debugfs exited with {code:?} extracting {guest_path}")]
    ExtractStatus {
        guest_path: String,
        code: Option<i32>,
    },
}

/// External collaborators of the event pipelines.
pub trait Platform: Send + Sync {
    /// Time since boot.
    fn uptime(&self) -> Result<Duration, PlatformError>;

    /// Prepare sender-specific dynamic properties. Failure is fatal at
    /// bootstrap.
    fn init_properties(&self, sender: &SenderConfig) -> Result<(), PlatformError>;

    /// Whether a software update was applied since the previous boot.
    fn swupdated(&self, sender: &SenderConfig) -> Result<bool, PlatformError>;

    /// Last startup reason, never empty.
    fn startup_reason(&self) -> String;

    /// Copy `guest_path` out of the guest disk image into `dest`.
    fn extract_guest_logs(&self, guest_path: &str, dest: &Path) -> Result<(), PlatformError>;
}

/// Default host-backed capabilities.
#[derive(Debug, Clone)]
pub struct SystemPlatform {
    config: PlatformConfig,
    runner: ToolRunner,
    uptime_path: PathBuf,
}

impl SystemPlatform {
    pub fn new(config: PlatformConfig, runner: ToolRunner) -> Self {
        Self {
            config,
            runner,
            uptime_path: PathBuf::from(PROC_UPTIME),
        }
    }

    /// Read uptime from somewhere other than `/proc/uptime`.
    pub fn with_uptime_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.uptime_path = path.into();
        self
    }

    fn build_version(&self) -> Result<String, PlatformError> {
        let Some(path) = &self.config.version_file else {
            return Ok(UNKNOWN_REASON.to_string());
        };
        let raw = fs::read_to_string(path).map_err(|e| PlatformError::Io {
            path: path.clone(),
            source: e,
        })?;
        let version = raw.trim();
        Ok(if version.is_empty() {
            UNKNOWN_REASON.to_string()
        } else {
            version.to_string()
        })
    }
}

impl Platform for SystemPlatform {
    fn uptime(&self) -> Result<Duration, PlatformError> {
        let content = fs::read_to_string(&self.uptime_path).map_err(|e| PlatformError::Io {
            path: self.uptime_path.clone(),
            source: e,
        })?;
        parse_proc_uptime(&content).ok_or_else(|| PlatformError::Uptime {
            path: self.uptime_path.clone(),
            content: content.trim().to_string(),
        })
    }

    fn init_properties(&self, sender: &SenderConfig) -> Result<(), PlatformError> {
        let version = self.build_version()?;
        let path = sender.outdir.join(PROPERTIES_FILE);
        let body = format!("SENDER={}\nBUILD={}\n", sender.name, version);
        fs::write(&path, body).map_err(|e| PlatformError::Io {
            path: path.clone(),
            source: e,
        })?;
        debug!(sender = %sender.name, path = %path.display(), "properties initialized");
        Ok(())
    }

    fn swupdated(&self, sender: &SenderConfig) -> Result<bool, PlatformError> {
        let current = self.build_version()?;
        let path = sender.outdir.join(LASTBUILD_FILE);
        let previous = match fs::read_to_string(&path) {
            Ok(s) => Some(s.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(PlatformError::Io { path, source: e }),
        };

        if previous.as_deref() == Some(current.as_str()) {
            return Ok(false);
        }
        fs::write(&path, format!("{current}\n")).map_err(|e| PlatformError::Io {
            path: path.clone(),
            source: e,
        })?;
        info!(previous = ?previous, current = %current, "build changed since last boot");
        Ok(true)
    }

    fn startup_reason(&self) -> String {
        let Some(path) = &self.config.startup_reason_file else {
            return UNKNOWN_REASON.to_string();
        };
        match fs::read_to_string(path) {
            Ok(raw) if !raw.trim().is_empty() => raw.trim().to_string(),
            Ok(_) => UNKNOWN_REASON.to_string(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read startup reason");
                UNKNOWN_REASON.to_string()
            }
        }
    }

    fn extract_guest_logs(&self, guest_path: &str, dest: &Path) -> Result<(), PlatformError> {
        let Some(loop_dev) = &self.config.loop_device else {
            warn!(guest_path, "no loop device configured, skipping guest extraction");
            return Ok(());
        };
        let program = self.config.debugfs.as_deref().unwrap_or(DEFAULT_DEBUGFS);
        let request = format!("rdump {} {}", guest_path, dest.display());
        let spec = ToolSpec::new(
            program,
            vec![
                "-R".to_string(),
                request,
                loop_dev.to_string_lossy().into_owned(),
            ],
        );

        let outcome = self.runner.run(&spec)?;
        if !outcome.success() {
            return Err(PlatformError::ExtractStatus {
                guest_path: guest_path.to_string(),
                code: outcome.exit_code,
            });
        }
        Ok(())
    }
}

/// First field of `/proc/uptime`, fractional seconds dropped.
fn parse_proc_uptime(content: &str) -> Option<Duration> {
    let first = content.split_whitespace().next()?;
    let secs = first.split('.').next()?.parse::<u64>().ok()?;
    Some(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn platform(dir: &Path, config: PlatformConfig) -> SystemPlatform {
        SystemPlatform::new(config, ToolRunner::with_defaults())
            .with_uptime_path(dir.join("uptime"))
    }

    #[test]
    fn proc_uptime_parses_whole_seconds() {
        assert_eq!(parse_proc_uptime("3723.45 1200.00\n"), Some(Duration::from_secs(3723)));
        assert_eq!(parse_proc_uptime("12 3"), Some(Duration::from_secs(12)));
        assert_eq!(parse_proc_uptime(""), None);
        assert_eq!(parse_proc_uptime("abc 1"), None);
    }

    #[test]
    fn uptime_reads_configured_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("uptime"), "61.99 0.00\n").unwrap();
        let p = platform(dir.path(), PlatformConfig::default());
        assert_eq!(p.uptime().unwrap(), Duration::from_secs(61));
    }

    #[test]
    fn startup_reason_falls_back_to_unknown() {
        let dir = TempDir::new().unwrap();
        let p = platform(dir.path(), PlatformConfig::default());
        assert_eq!(p.startup_reason(), UNKNOWN_REASON);

        let reason = dir.path().join("reason");
        fs::write(&reason, "WATCHDOG\n").unwrap();
        let p = platform(
            dir.path(),
            PlatformConfig {
                startup_reason_file: Some(reason),
                ..Default::default()
            },
        );
        assert_eq!(p.startup_reason(), "WATCHDOG");
    }

    #[test]
    fn swupdated_reports_once_per_build() {
        let dir = TempDir::new().unwrap();
        let version = dir.path().join("version");
        fs::write(&version, "build-1\n").unwrap();
        let p = platform(
            dir.path(),
            PlatformConfig {
                version_file: Some(version.clone()),
                ..Default::default()
            },
        );
        let sender = SenderConfig::new("crashlog", dir.path(), 1 << 20);

        assert!(p.swupdated(&sender).unwrap());
        assert!(!p.swupdated(&sender).unwrap());

        fs::write(&version, "build-2\n").unwrap();
        assert!(p.swupdated(&sender).unwrap());
        assert_eq!(
            fs::read_to_string(dir.path().join(LASTBUILD_FILE)).unwrap(),
            "build-2\n"
        );
    }

    #[test]
    fn init_properties_writes_file() {
        let dir = TempDir::new().unwrap();
        let p = platform(dir.path(), PlatformConfig::default());
        let sender = SenderConfig::new("crashlog", dir.path(), 1 << 20);
        p.init_properties(&sender).unwrap();

        let body = fs::read_to_string(dir.path().join(PROPERTIES_FILE)).unwrap();
        assert!(body.contains("SENDER=crashlog"));
        assert!(body.contains("BUILD=UNKNOWN"));
    }

    #[test]
    fn extraction_without_loop_device_is_skipped() {
        let dir = TempDir::new().unwrap();
        let p = platform(dir.path(), PlatformConfig::default());
        p.extract_guest_logs("logs/foo", dir.path()).unwrap();
    }
}
