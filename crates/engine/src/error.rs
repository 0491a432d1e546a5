//! Engine error types.

use stratus_core::FunctionId;
use stratus_ports::StoreError;

/// Why an execution record could not be written.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The masked event could not be serialized.
    #[error("event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The store rejected the insert.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Conditions that prevented an execution from being attempted.
///
/// A function that ran and failed is *not* an `EngineError`; see
/// [`ExecutionOutcome`](crate::ExecutionOutcome).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No function with this id.
    #[error("function not found: {function_id}")]
    FunctionNotFound {
        /// The id that was looked up.
        function_id: FunctionId,
    },

    /// The function exists but is disabled.
    #[error("function {function_id} is disabled")]
    FunctionDisabled {
        /// The disabled function.
        function_id: FunctionId,
    },

    /// The function has no version to run.
    #[error("function {function_id} has no active version")]
    NoActiveVersion {
        /// The function without versions.
        function_id: FunctionId,
    },

    /// The `pending` execution record could not be written.
    #[error("failed to record execution for function {function_id}: {source}")]
    ExecutionRecord {
        /// The function that was about to run.
        function_id: FunctionId,
        /// Underlying cause.
        #[source]
        source: RecordError,
    },

    /// The store failed while resolving the function or version.
    #[error("store error while resolving function {function_id}: {source}")]
    Store {
        /// The function being resolved.
        function_id: FunctionId,
        /// Underlying cause.
        #[source]
        source: StoreError,
    },
}

impl EngineError {
    /// HTTP status the entry point answers with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::FunctionNotFound { .. } => 404,
            Self::FunctionDisabled { .. } => 403,
            Self::NoActiveVersion { .. } | Self::ExecutionRecord { .. } | Self::Store { .. } => 500,
        }
    }

    /// The function the failed request addressed.
    #[must_use]
    pub fn function_id(&self) -> FunctionId {
        match self {
            Self::FunctionNotFound { function_id }
            | Self::FunctionDisabled { function_id }
            | Self::NoActiveVersion { function_id }
            | Self::ExecutionRecord { function_id, .. }
            | Self::Store { function_id, .. } => *function_id,
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// The engine never retries by itself.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store { source, .. }
            | Self::ExecutionRecord {
                source: RecordError::Store(source),
                ..
            } => source.is_retryable(),
            _ => false,
        }
    }
}
