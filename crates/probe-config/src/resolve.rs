//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI argument → environment variable → XDG config home →
//! system config.

use std::path::{Path, PathBuf};

/// Where the configuration file was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,
    /// Set via `PROBE_CONFIG`.
    Environment,
    /// Found in the XDG config directory.
    XdgConfig,
    /// Found in /etc/crashprobe/.
    SystemConfig,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
        }
    }
}

/// A config file path with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub source: ConfigSource,
}

const ENV_CONFIG_PATH: &str = "PROBE_CONFIG";
const CONFIG_FILENAME: &str = "probe.json";
const APP_NAME: &str = "crashprobe";
const SYSTEM_CONFIG_DIR: &str = "/etc/crashprobe";

/// Resolve the configuration file path.
///
/// An explicit CLI path is returned even when it does not exist so the
/// caller reports the real I/O error instead of silently falling through.
pub fn resolve_config(cli_path: Option<&Path>) -> Option<ResolvedPath> {
    if let Some(path) = cli_path {
        return Some(ResolvedPath {
            path: path.to_path_buf(),
            source: ConfigSource::CliArgument,
        });
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Some(ResolvedPath {
                path,
                source: ConfigSource::Environment,
            });
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join(APP_NAME).join(CONFIG_FILENAME);
        if path.exists() {
            return Some(ResolvedPath {
                path,
                source: ConfigSource::XdgConfig,
            });
        }
    }

    let path = Path::new(SYSTEM_CONFIG_DIR).join(CONFIG_FILENAME);
    if path.exists() {
        return Some(ResolvedPath {
            path,
            source: ConfigSource::SystemConfig,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_path_wins_even_if_missing() {
        let resolved = resolve_config(Some(Path::new("/nonexistent/probe.json"))).unwrap();
        assert_eq!(resolved.source, ConfigSource::CliArgument);
        assert_eq!(resolved.path, PathBuf::from("/nonexistent/probe.json"));
    }

    #[test]
    fn source_display() {
        assert_eq!(ConfigSource::Environment.to_string(), "environment variable");
        assert_eq!(ConfigSource::XdgConfig.to_string(), "XDG config");
    }
}
