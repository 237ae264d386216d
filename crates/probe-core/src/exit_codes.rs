//! Exit codes for the probe-core CLI.
//!
//! Exit code ranges:
//! - 0: success
//! - 10-19: user/environment errors (fixable by the operator)
//! - 20-29: internal or startup errors

use probe_config::ConfigError;

use crate::sender::BootstrapError;

/// Stable process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command completed.
    Clean = 0,

    /// Invalid arguments, unknown crash/info name.
    ArgsError = 10,

    /// Config missing, unreadable or invalid.
    ConfigError = 11,

    /// Permission denied on an output path.
    PermissionError = 12,

    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,

    /// Sender bootstrap failed.
    StartupError = 22,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Codes 10-19.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Stable name for machine-readable output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::PermissionError => "ERR_PERMISSION",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
            ExitCode::StartupError => "ERR_STARTUP",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<&ConfigError> for ExitCode {
    fn from(err: &ConfigError) -> Self {
        match err {
            ConfigError::IoError { source, .. }
                if source.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                ExitCode::PermissionError
            }
            _ => ExitCode::ConfigError,
        }
    }
}

impl From<&BootstrapError> for ExitCode {
    fn from(err: &BootstrapError) -> Self {
        match err {
            BootstrapError::OutDir { source, .. } | BootstrapError::UptimeMarker { source, .. }
                if source.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                ExitCode::PermissionError
            }
            BootstrapError::Quota { .. } => ExitCode::ConfigError,
            _ => ExitCode::StartupError,
        }
    }
}
