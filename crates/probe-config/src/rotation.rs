//! Rotation-selector syntax for `file_rotation` log sources.
//!
//! ```text
//!  dir        prefix     selector
//!  |          |          |
//!  /tmp/hvlog/hvlog_cur.[biggest]
//! ```

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RotationError {
    #[error("rotation path {0:?} has no directory component (absolute path required)")]
    NoDirectory(String),

    #[error("rotation path {0:?} is missing the \".[\" selector opener")]
    MissingSelector(String),

    #[error("rotation path {0:?} is missing the closing \"]\"")]
    Unterminated(String),

    #[error("unknown rotation selector {selector:?} in {path:?}")]
    UnknownSelector { path: String, selector: String },
}

/// Which rotated files are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Highest numeric suffix only.
    Biggest,
    /// Lowest numeric suffix only.
    Smallest,
    /// Every matching file.
    All,
}

impl std::str::FromStr for Selector {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "biggest" => Ok(Selector::Biggest),
            "smallest" => Ok(Selector::Smallest),
            "all" => Ok(Selector::All),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Biggest => write!(f, "biggest"),
            Selector::Smallest => write!(f, "smallest"),
            Selector::All => write!(f, "all"),
        }
    }
}

/// Parsed `dir/prefix.[selector]` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPattern {
    pub dir: PathBuf,
    pub prefix: String,
    pub selector: Selector,
}

impl RotationPattern {
    pub fn parse(path: &str) -> Result<Self, RotationError> {
        let slash = path
            .rfind('/')
            .ok_or_else(|| RotationError::NoDirectory(path.to_string()))?;
        let dir = match &path[..slash] {
            "" => "/",
            d => d,
        };
        let rest = &path[slash + 1..];

        let open = rest
            .find(".[")
            .ok_or_else(|| RotationError::MissingSelector(path.to_string()))?;
        let prefix = &rest[..open];
        let selector = rest[open + 2..]
            .strip_suffix(']')
            .ok_or_else(|| RotationError::Unterminated(path.to_string()))?;

        let selector = selector
            .parse::<Selector>()
            .map_err(|_| RotationError::UnknownSelector {
                path: path.to_string(),
                selector: selector.to_string(),
            })?;

        Ok(Self {
            dir: PathBuf::from(dir),
            prefix: prefix.to_string(),
            selector,
        })
    }

    /// Whether a directory entry belongs to this rotation family.
    pub fn matches(&self, file_name: &str) -> bool {
        file_name.contains(&self.prefix)
    }
}

/// Numeric rotation index: the leading digits after the last `.`, 0 when absent.
pub fn rotation_index(file_name: &str) -> u64 {
    let Some(dot) = file_name.rfind('.') else {
        return 0;
    };
    let digits: String = file_name[dot + 1..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}
