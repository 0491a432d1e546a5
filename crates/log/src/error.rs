//! Logger setup errors.

/// Result alias for logger setup.
pub type LogResult<T> = Result<T, LogError>;

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The filter directive did not parse.
    #[error("invalid log filter {directive:?}: {reason}")]
    Filter {
        /// The rejected directive.
        directive: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber was already installed.
    #[error("failed to install subscriber: {0}")]
    Init(String),
}
