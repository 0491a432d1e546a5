//! Runtime error types.

/// Failures raised while running user code.
///
/// All of these are *execution outcomes*: the engine stores the message on
/// the execution record instead of returning it to its caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// The code could not be parsed.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// The code ran and raised an error.
    #[error("{0}")]
    Failed(String),

    /// The code did not finish within its budget.
    #[error("execution timed out after {elapsed_ms}ms")]
    Timeout {
        /// Budget that was exceeded.
        elapsed_ms: u64,
    },

    /// The runtime itself misbehaved.
    #[error("runtime error: {0}")]
    Internal(String),
}

impl RuntimeError {
    /// Convenience constructor for [`RuntimeError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Whether the budget ran out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
