//! Error types for store operations.
//!
//! Every port method returns `Result<_, StoreError>`. Drivers map their
//! internal failures into these variants so callers can tell "not found"
//! from "rejected" from "backend unavailable" without knowing the backend.

use std::time::Duration;

use stratus_core::{ExecutionId, FunctionId, VersionId};
use stratus_execution::ExecutionStatus;
use stratus_function::FunctionError;

/// Error type for all store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No function with this id.
    #[error("function not found: {0}")]
    FunctionNotFound(FunctionId),

    /// No version with this id.
    #[error("version not found: {0}")]
    VersionNotFound(VersionId),

    /// The function has no version with this number.
    #[error("version {version} of function {function_id} not found")]
    VersionNumberNotFound {
        /// Owning function.
        function_id: FunctionId,
        /// Requested version number.
        version: u32,
    },

    /// The function has no versions yet.
    #[error("function {0} has no active version")]
    NoActiveVersion(FunctionId),

    /// No execution with this id.
    #[error("execution not found: {0}")]
    ExecutionNotFound(ExecutionId),

    /// The active version cannot be deleted.
    #[error("cannot delete active version {0}")]
    CannotDeleteActiveVersion(VersionId),

    /// The version is referenced by recorded executions.
    #[error("version {version_id} is referenced by {executions} execution(s)")]
    VersionInUse {
        /// The version that was to be deleted.
        version_id: VersionId,
        /// How many executions reference it.
        executions: usize,
    },

    /// An execution update that would leave a terminal state.
    #[error("execution {execution_id}: invalid transition {from} -> {to}")]
    InvalidTransition {
        /// The execution being updated.
        execution_id: ExecutionId,
        /// Current status.
        from: ExecutionStatus,
        /// Requested status.
        to: ExecutionStatus,
    },

    /// Rejected function definition or patch.
    #[error("invalid function: {0}")]
    InvalidFunction(#[from] FunctionError),

    /// The backend could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// Operation exceeded its deadline.
    #[error("timeout: {operation} after {duration:?}")]
    Timeout {
        /// Store operation that gave up.
        operation: String,
        /// Time spent waiting.
        duration: Duration,
    },

    /// Catch-all internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Convenience constructor for [`StoreError::Timeout`].
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Returns `true` for transient errors a caller may retry.
    ///
    /// Only [`Connection`](Self::Connection) and [`Timeout`](Self::Timeout) qualify.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout { .. })
    }

    /// Whether the error means the addressed entity does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::FunctionNotFound(_)
                | Self::VersionNotFound(_)
                | Self::VersionNumberNotFound { .. }
                | Self::NoActiveVersion(_)
                | Self::ExecutionNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn only_connection_and_timeout_are_retryable() {
        assert!(StoreError::Connection("refused".into()).is_retryable());
        assert!(StoreError::timeout("get_function", Duration::from_secs(1)).is_retryable());
        assert!(!StoreError::FunctionNotFound(FunctionId::v4()).is_retryable());
        assert!(!StoreError::CannotDeleteActiveVersion(VersionId::v4()).is_retryable());
        assert!(!StoreError::Internal("oops".into()).is_retryable());
    }

    #[test]
    fn not_found_classification() {
        assert!(StoreError::NoActiveVersion(FunctionId::v4()).is_not_found());
        assert!(StoreError::ExecutionNotFound(ExecutionId::v4()).is_not_found());
        assert!(!StoreError::Connection("x".into()).is_not_found());
        assert!(
            !StoreError::VersionInUse {
                version_id: VersionId::v4(),
                executions: 1
            }
            .is_not_found()
        );
    }

    #[test]
    fn display_invalid_transition() {
        let id = ExecutionId::nil();
        let err = StoreError::InvalidTransition {
            execution_id: id,
            from: ExecutionStatus::Success,
            to: ExecutionStatus::Error,
        };
        assert_eq!(
            err.to_string(),
            format!("execution {id}: invalid transition success -> error")
        );
    }

    #[test]
    fn function_errors_convert() {
        let err: StoreError = FunctionError::EmptyName.into();
        assert!(matches!(err, StoreError::InvalidFunction(FunctionError::EmptyName)));
    }

    #[test]
    fn display_timeout() {
        let err = StoreError::timeout("ping", Duration::from_millis(250));
        assert_eq!(err.to_string(), "timeout: ping after 250ms");
    }
}
