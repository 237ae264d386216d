//! Log level and format selection.
//!
//! Precedence, highest first: `--log-level`/`--log-format`, `PROBE_LOG` /
//! `PROBE_LOG_FORMAT`, raw `RUST_LOG` directives, built-in defaults.

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    Jsonl,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

/// Log level filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" | "quiet" => Ok(LogLevel::Off),
            _ => Err(format!("unknown log level: {}", s)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// `RUST_LOG` directives, kept only when no explicit level was chosen.
    pub directives: Option<String>,
}

impl LogConfig {
    /// Read the environment, then apply CLI overrides.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::resolve(
            std::env::var("PROBE_LOG").ok().as_deref(),
            std::env::var("RUST_LOG").ok().as_deref(),
            std::env::var("PROBE_LOG_FORMAT").ok().as_deref(),
            cli_level,
            cli_format,
        )
    }

    fn resolve(
        probe_log: Option<&str>,
        rust_log: Option<&str>,
        probe_format: Option<&str>,
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
    ) -> Self {
        let env_level = probe_log.and_then(|v| v.parse().ok());
        let level = cli_level.or(env_level);
        let directives = match level {
            Some(_) => None,
            None => rust_log
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        };
        let format = cli_format
            .or_else(|| probe_format.and_then(|v| v.parse().ok()))
            .unwrap_or_default();

        Self {
            format,
            level: level.unwrap_or_default(),
            directives,
        }
    }

    /// The `EnvFilter` directive string this config stands for.
    pub fn filter_directives(&self) -> String {
        match &self.directives {
            Some(raw) => raw.clone(),
            None => format!("probe_core={l},probe_config={l}", l = self.level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Jsonl);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("quiet".parse::<LogLevel>().unwrap(), LogLevel::Off);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn cli_level_beats_rust_log() {
        let config = LogConfig::resolve(None, Some("trace"), None, Some(LogLevel::Error), None);
        assert_eq!(config.directives, None);
        assert_eq!(
            config.filter_directives(),
            "probe_core=error,probe_config=error"
        );
    }

    #[test]
    fn probe_log_beats_rust_log() {
        let config = LogConfig::resolve(Some("warn"), Some("debug"), None, None, None);
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.filter_directives(), "probe_core=warn,probe_config=warn");
    }

    #[test]
    fn rust_log_used_verbatim_without_explicit_level() {
        let config = LogConfig::resolve(None, Some(" probe_core=debug "), None, None, None);
        assert_eq!(config.filter_directives(), "probe_core=debug");
    }

    #[test]
    fn format_precedence() {
        let env_only = LogConfig::resolve(None, None, Some("jsonl"), None, None);
        assert_eq!(env_only.format, LogFormat::Jsonl);
        let cli = LogConfig::resolve(None, None, Some("jsonl"), None, Some(LogFormat::Human));
        assert_eq!(cli.format, LogFormat::Human);
        assert_eq!(LogConfig::resolve(None, None, None, None, None), LogConfig::default());
    }
}
