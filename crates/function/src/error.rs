//! Function definition validation errors.

use thiserror::Error;

/// Errors raised while validating function definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FunctionError {
    /// The function name was empty or whitespace.
    #[error("function name cannot be empty")]
    EmptyName,

    /// Retention is not one of the allowed values.
    #[error("retention of {0} days is not allowed (expected one of 7, 15, 30, 365)")]
    InvalidRetention(u16),

    /// The cron expression could not be parsed.
    #[error("invalid cron expression `{expr}`: {reason}")]
    InvalidCron {
        /// Expression as supplied.
        expr: String,
        /// Parser message.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_cron_display() {
        let err = FunctionError::InvalidCron {
            expr: "nope".into(),
            reason: "bad field".into(),
        };
        assert_eq!(err.to_string(), "invalid cron expression `nope`: bad field");
    }

    #[test]
    fn invalid_retention_display() {
        assert_eq!(
            FunctionError::InvalidRetention(3).to_string(),
            "retention of 3 days is not allowed (expected one of 7, 15, 30, 365)"
        );
    }
}
