//! Logger configuration and presets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Multi-line human output.
    Pretty,
    /// Single-line human output.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?}")),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

/// Logger configuration.
///
/// Deserializes from the `[log]` table of the server config; every key is
/// optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `EnvFilter` directive, e.g. `info,stratus_engine=debug`.
    pub level: String,
    /// Output format.
    pub format: Format,
    /// ANSI colors.
    pub ansi: bool,
    /// Print event targets.
    pub target: bool,
    /// Service name attached to a root span, if set.
    pub service: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: Format::Compact,
            ansi: true,
            target: true,
            service: None,
        }
    }
}

impl Config {
    /// Defaults overridden by `STRATUS_LOG` (or `RUST_LOG`) and
    /// `STRATUS_LOG_FORMAT`. An unknown format keeps the default.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(level) = std::env::var("STRATUS_LOG").or_else(|_| std::env::var("RUST_LOG")) {
            config.level = level;
        }
        if let Some(format) = std::env::var("STRATUS_LOG_FORMAT")
            .ok()
            .and_then(|f| f.parse().ok())
        {
            config.format = format;
        }
        config
    }

    /// Debug level, pretty output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_owned(),
            format: Format::Pretty,
            ..Self::default()
        }
    }

    /// Info level, JSON without colors.
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: "info".to_owned(),
            format: Format::Json,
            ansi: false,
            ..Self::default()
        }
    }
}
