//! Execution error types.

use thiserror::Error;

use crate::status::ExecutionStatus;

/// Errors about execution records themselves.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A state transition is not valid for the current status.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: ExecutionStatus,
        /// Attempted target status.
        to: ExecutionStatus,
    },

    /// A serialization or deserialization error.
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ExecutionError {
    /// Create an invalid-transition error.
    pub fn invalid_transition(from: ExecutionStatus, to: ExecutionStatus) -> Self {
        Self::InvalidTransition { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_display() {
        let err = ExecutionError::invalid_transition(ExecutionStatus::Success, ExecutionStatus::Error);
        assert_eq!(err.to_string(), "invalid transition from success to error");
    }

    #[test]
    fn from_serde_error() {
        let serde_err = serde_json::from_str::<String>("not valid json").unwrap_err();
        let err = ExecutionError::from(serde_err);
        assert!(err.to_string().starts_with("serialization:"));
    }
}
