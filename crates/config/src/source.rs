//! Configuration source descriptors.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Origin of one configuration layer.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Built-in defaults.
    Default,
    /// A TOML file.
    File(PathBuf),
    /// Environment variables with the given prefix.
    Env(String),
}

impl ConfigSource {
    /// Check if this source is file-based.
    pub fn is_file_based(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("defaults"),
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Env(prefix) => write!(f, "environment ({prefix}_*)"),
        }
    }
}
