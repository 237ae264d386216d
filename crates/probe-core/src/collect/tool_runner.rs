//! Bounded execution of external commands.
//!
//! Used by `cmd` log capture (stdout streamed into the evidence file) and by
//! the guest disk-image extraction helper.
//!
//! - Per-command deadline with SIGTERM → SIGKILL escalation sent to the
//!   child's whole process group, so shell pipelines die with it
//! - stdout goes straight to its sink; nothing is buffered or truncated
//! - Shell captures inherit the daemon's environment; other tools get a
//!   minimal one
//!
//! # Example
//!
//! ```ignore
//! use probe_core::collect::tool_runner::{Sink, ToolRunner, ToolSpec};
//!
//! let runner = ToolRunner::with_defaults();
//! let spec = ToolSpec::shell("dmesg -T").with_sink(Sink::File("/tmp/out/dmesg".into()));
//! let outcome = runner.run(&spec)?;
//! ```

use std::fs::File;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, instrument, trace, warn};

/// Default deadline per command in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Grace period between SIGTERM and SIGKILL in milliseconds.
const SIGTERM_GRACE_MS: u64 = 500;

/// Poll interval while waiting for the child.
const POLL_INTERVAL_MS: u64 = 10;

/// Errors that can occur during tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("empty command line")]
    EmptyCommand,

    #[error("cannot open output {path}: {source}")]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("command {command:?} failed to spawn: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for {command:?}: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Where the child's stdout goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    /// Created (truncated) and written directly by the child.
    File(PathBuf),
    /// Discarded.
    Null,
}

/// A tool invocation: program, arguments and output handling.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Override deadline (None = runner default).
    pub timeout: Option<Duration>,
    pub sink: Sink,
    /// Pass the parent environment through instead of `PATH` and `C` locale.
    pub inherit_env: bool,
}

impl ToolSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: None,
            sink: Sink::Null,
            inherit_env: false,
        }
    }

    /// Run a full command line through `sh -c` with the caller's environment.
    pub fn shell(command_line: impl Into<String>) -> Self {
        let mut spec = Self::new("sh", vec!["-c".to_string(), command_line.into()]);
        spec.inherit_env = true;
        spec
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_sink(mut self, sink: Sink) -> Self {
        self.sink = sink;
        self
    }

    fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub command: String,
    /// Exit code, `None` when killed by a signal.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration: Duration,
}

impl ToolOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs external commands with a deadline.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    default_timeout: Duration,
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ToolRunner {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    pub fn with_defaults() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run `spec` to completion or until its deadline.
    ///
    /// A timed-out run is not an error: whatever the child already wrote to
    /// its sink is kept and `timed_out` is set.
    #[instrument(skip(self, spec), fields(cmd = %spec.program))]
    pub fn run(&self, spec: &ToolSpec) -> Result<ToolOutcome, ToolError> {
        if spec.program.trim().is_empty() {
            return Err(ToolError::EmptyCommand);
        }
        let command = spec.display();
        let timeout = spec.timeout.unwrap_or(self.default_timeout);

        let stdout = match &spec.sink {
            Sink::File(path) => Stdio::from(File::create(path).map_err(|e| ToolError::Sink {
                path: path.clone(),
                source: e,
            })?),
            Sink::Null => Stdio::null(),
        };

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::null())
            .process_group(0);
        if !spec.inherit_env {
            cmd.env_clear();
            if let Ok(path) = std::env::var("PATH") {
                cmd.env("PATH", path);
            }
            cmd.env("LC_ALL", "C");
            cmd.env("LANG", "C");
        }

        debug!(
            command = %command,
            timeout_ms = timeout.as_millis() as u64,
            "running tool"
        );
        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            error!(command = %command, error = %e, "failed to spawn");
            ToolError::SpawnFailed {
                command: command.clone(),
                source: e,
            }
        })?;

        let (exit_code, timed_out) =
            wait_with_deadline(&mut child, start + timeout).map_err(|e| ToolError::Wait {
                command: command.clone(),
                source: e,
            })?;

        let duration = start.elapsed();
        if timed_out {
            warn!(
                command = %command,
                timeout_ms = timeout.as_millis() as u64,
                "command timed out, output kept"
            );
        }
        Ok(ToolOutcome {
            command,
            exit_code,
            timed_out,
            duration,
        })
    }
}

/// Poll `child` until it exits or `deadline` passes.
fn wait_with_deadline(
    child: &mut Child,
    deadline: Instant,
) -> std::io::Result<(Option<i32>, bool)> {
    loop {
        if let Some(status) = child.try_wait()? {
            trace!(exit_code = ?status.code(), "process exited");
            return Ok((status.code(), false));
        }
        if Instant::now() >= deadline {
            kill_with_grace(child);
            let status = child.wait().ok();
            return Ok((status.and_then(|s| s.code()), true));
        }
        thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
    }
}

/// SIGTERM to the child's process group, then SIGKILL after the grace
/// period. The group is killed even when the leader already exited so that
/// background jobs it forked cannot keep writing.
fn kill_with_grace(child: &mut Child) {
    let pgid = child.id() as i32;

    // SAFETY: the child leads its own group and has not been reaped, so the
    // group id still names our processes.
    unsafe {
        libc::kill(-pgid, libc::SIGTERM);
    }
    debug!(pgid, "sent SIGTERM to process group");

    thread::sleep(Duration::from_millis(SIGTERM_GRACE_MS));

    match child.try_wait() {
        Ok(Some(_)) => trace!(pgid, "group leader exited after SIGTERM"),
        Ok(None) => warn!(pgid, "process did not exit after SIGTERM, sending SIGKILL"),
        Err(e) => error!(pgid, error = %e, "failed to check process status"),
    }
    // SAFETY: a process group id is not reused while any member survives;
    // with no members left this is a harmless ESRCH.
    unsafe {
        libc::kill(-pgid, libc::SIGKILL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn shell_output_lands_in_file() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let spec = ToolSpec::shell("echo hello; echo world").with_sink(Sink::File(out.clone()));

        let outcome = ToolRunner::with_defaults().run(&spec).unwrap();
        assert!(outcome.success());
        assert!(!outcome.timed_out);
        assert_eq!(fs::read_to_string(out).unwrap(), "hello\nworld\n");
    }

    #[test]
    fn nonzero_exit_is_reported_not_error() {
        let outcome = ToolRunner::with_defaults()
            .run(&ToolSpec::shell("exit 42"))
            .unwrap();
        assert!(!outcome.success());
        assert_eq!(outcome.exit_code, Some(42));
    }

    #[test]
    fn timeout_kills_and_keeps_partial_output() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let spec = ToolSpec::shell("echo started; exec sleep 10")
            .with_timeout(Duration::from_millis(200))
            .with_sink(Sink::File(out.clone()));

        let outcome = ToolRunner::with_defaults().run(&spec).unwrap();
        assert!(outcome.timed_out);
        assert!(outcome.duration < Duration::from_secs(5));
        assert_eq!(fs::read_to_string(out).unwrap(), "started\n");
    }

    #[test]
    fn timeout_stops_background_jobs_of_the_shell() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let spec = ToolSpec::shell("echo started; (sleep 1; echo late_write)")
            .with_timeout(Duration::from_millis(200))
            .with_sink(Sink::File(out.clone()));

        let outcome = ToolRunner::with_defaults().run(&spec).unwrap();
        assert!(outcome.timed_out);

        thread::sleep(Duration::from_millis(1500));
        assert_eq!(fs::read_to_string(out).unwrap(), "started\n");
    }

    #[test]
    fn shell_inherits_environment() {
        let Ok(home) = std::env::var("HOME") else {
            return;
        };
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let spec = ToolSpec::shell("printf %s \"$HOME\"").with_sink(Sink::File(out.clone()));

        ToolRunner::with_defaults().run(&spec).unwrap();
        assert_eq!(fs::read_to_string(out).unwrap(), home);
    }

    #[test]
    fn plain_tools_get_minimal_environment() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let script = "printf %s \"$LANG:${HOME-unset}\"";
        let spec = ToolSpec::new("sh", vec!["-c".into(), script.into()])
            .with_sink(Sink::File(out.clone()));

        ToolRunner::with_defaults().run(&spec).unwrap();
        assert_eq!(fs::read_to_string(out).unwrap(), "C:unset");
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let spec = ToolSpec::new("/nonexistent/command/that/does/not/exist", vec![]);
        match ToolRunner::with_defaults().run(&spec) {
            Err(ToolError::SpawnFailed { .. }) => {}
            other => panic!("expected SpawnFailed, got {other:?}"),
        }
    }

    #[test]
    fn unwritable_sink_is_reported() {
        let spec = ToolSpec::shell("true").with_sink(Sink::File("/nonexistent/dir/out".into()));
        assert!(matches!(
            ToolRunner::with_defaults().run(&spec),
            Err(ToolError::Sink { .. })
        ));
    }

    #[test]
    fn spec_builder() {
        let spec = ToolSpec::new("debugfs", vec!["-R".into(), "rdump a b".into()])
            .with_timeout(Duration::from_secs(5));
        assert_eq!(spec.timeout, Some(Duration::from_secs(5)));
        assert_eq!(spec.sink, Sink::Null);
        assert!(!spec.inherit_env);
        assert!(ToolSpec::shell("true").inherit_env);
        assert_eq!(spec.display(), "debugfs -R rdump a b");
        assert!(matches!(
            ToolRunner::with_defaults().run(&ToolSpec::new(" ", vec![])),
            Err(ToolError::EmptyCommand)
        ));
    }
}
