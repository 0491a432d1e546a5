//! Configuration errors.

use std::path::PathBuf;

use crate::source::ConfigSource;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A source did not parse.
    #[error("failed to parse {origin}: {message}")]
    Parse {
        /// Source that failed.
        origin: ConfigSource,
        /// Parser message.
        message: String,
    },

    /// The merged document does not fit [`AppConfig`](crate::AppConfig).
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid value for `{field}`: {message}")]
    Validation {
        /// Dotted key of the offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}
