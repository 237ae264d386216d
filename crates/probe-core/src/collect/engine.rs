//! Strategy dispatch and timing for a single log source.

use probe_config::{LogKind, LogSource, RotationPattern, Selector};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::copy::{copy_file, drain_node, tail_file, TailOutcome};
use super::rotation::{list_candidates, select_rotated};
use super::tool_runner::{Sink, ToolRunner, ToolSpec};
use super::CollectError;
use crate::platform::Platform;

/// Collections at least this slow are logged at warn level.
pub const SLOW_COLLECTION: Duration = Duration::from_secs(5);

/// Uptime rendered as `HHHH:MM:SS`, used to name tail output.
pub fn uptime_label(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!(
        "{:04}:{:02}:{:02}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60
    )
}

/// Copies one [`LogSource`] into an evidence directory.
///
/// Quota admission is the caller's job; this only runs the strategy.
pub struct LogCollector<'a> {
    runner: &'a ToolRunner,
    platform: &'a dyn Platform,
}

impl<'a> LogCollector<'a> {
    pub fn new(runner: &'a ToolRunner, platform: &'a dyn Platform) -> Self {
        Self { runner, platform }
    }

    /// Run the strategy for `log` and return the files it produced.
    pub fn collect(&self, log: &LogSource, dest_dir: &Path) -> Result<Vec<PathBuf>, CollectError> {
        let start = Instant::now();
        let result = self.fetch(log, dest_dir);
        let spent = start.elapsed();

        if spent >= SLOW_COLLECTION {
            warn!(
                log = %log.name,
                kind = %log.kind,
                spent_secs = spent.as_secs(),
                "slow log collection"
            );
        } else {
            debug!(
                log = %log.name,
                kind = %log.kind,
                spent_ms = spent.as_millis() as u64,
                "log collected"
            );
        }
        result
    }

    fn fetch(&self, log: &LogSource, dest_dir: &Path) -> Result<Vec<PathBuf>, CollectError> {
        match log.kind {
            LogKind::File => {
                self.fetch_file(&log.name, Path::new(&log.path), log.tail_limit(), dest_dir)
            }
            LogKind::Node => {
                let dest = dest_dir.join(&log.name);
                drain_node(Path::new(&log.path), &dest)?;
                Ok(vec![dest])
            }
            LogKind::Cmd => {
                let dest = dest_dir.join(&log.name);
                let spec = ToolSpec::shell(log.path.as_str()).with_sink(Sink::File(dest.clone()));
                let outcome = self.runner.run(&spec)?;
                if !outcome.success() && !outcome.timed_out {
                    debug!(
                        log = %log.name,
                        exit_code = ?outcome.exit_code,
                        "command exited non-zero"
                    );
                }
                Ok(vec![dest])
            }
            LogKind::FileRotation => self.fetch_rotation(log, dest_dir),
        }
    }

    /// Plain copy, or tail when a positive limit is set.
    fn fetch_file(
        &self,
        name: &str,
        src: &Path,
        tail: Option<usize>,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, CollectError> {
        let Some(lines) = tail else {
            let dest = dest_dir.join(name);
            copy_file(src, &dest)?;
            return Ok(vec![dest]);
        };

        let label = uptime_label(self.platform.uptime()?);
        let dest = dest_dir.join(format!("{name}_{label}"));
        match tail_file(src, &dest, lines)? {
            TailOutcome::Written { .. } => Ok(vec![dest]),
            TailOutcome::Empty => Ok(Vec::new()),
        }
    }

    fn fetch_rotation(
        &self,
        log: &LogSource,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, CollectError> {
        let pattern = RotationPattern::parse(&log.path)?;
        let selected = select_rotated(&pattern, list_candidates(&pattern)?);

        if pattern.selector == Selector::All {
            let mut produced = Vec::new();
            for path in selected {
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                match self.fetch_file(name, &path, log.tail_limit(), dest_dir) {
                    Ok(files) => produced.extend(files),
                    Err(e) => warn!(
                        log = %log.name,
                        path = %path.display(),
                        error = %e,
                        "rotated log failed"
                    ),
                }
            }
            return Ok(produced);
        }

        match selected.into_iter().next() {
            Some(target) => self.fetch_file(&log.name, &target, log.tail_limit(), dest_dir),
            None => {
                warn!(log = %log.name, dir = %pattern.dir.display(), "no logs found");
                Ok(Vec::new())
            }
        }
    }
}
