//! Execution result types.

use std::time::Duration;

use stratus_core::{ExecutionId, FunctionId, VersionId};
use stratus_execution::{ExecutionStatus, HttpResponse};
use stratus_runtime::RuntimeError;

/// How an attempted execution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The function answered with a status below 400, or not at all.
    Success,
    /// The function ran but answered with status 400 or above.
    ErrorStatus {
        /// The status it answered with.
        status_code: u16,
    },
    /// The function did not run to completion.
    Failed {
        /// What went wrong.
        error: RuntimeError,
    },
}

impl ExecutionOutcome {
    /// Status recorded on the execution.
    #[must_use]
    pub fn status(&self) -> ExecutionStatus {
        match self {
            Self::Success => ExecutionStatus::Success,
            Self::ErrorStatus { .. } | Self::Failed { .. } => ExecutionStatus::Error,
        }
    }

    /// Text stored as the execution's `error_message`.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Success => None,
            Self::ErrorStatus { status_code } => {
                Some(format!("function responded with status {status_code}"))
            }
            Self::Failed { error } => Some(error.to_string()),
        }
    }
}

/// The result of one attempted execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// The recorded execution.
    pub execution_id: ExecutionId,
    /// The function that ran.
    pub function_id: FunctionId,
    /// The version that ran.
    pub version_id: VersionId,
    /// Its version number.
    pub version: u32,
    /// The unmasked response, if the function produced one.
    pub response: Option<HttpResponse>,
    /// Wall-clock runtime duration.
    pub duration: Duration,
    /// Classification.
    pub outcome: ExecutionOutcome,
}

impl ExecutionResult {
    /// Recorded status.
    #[must_use]
    pub fn status(&self) -> ExecutionStatus {
        self.outcome.status()
    }

    /// The runtime error, if the code failed to run.
    #[must_use]
    pub fn error(&self) -> Option<&RuntimeError> {
        match &self.outcome {
            ExecutionOutcome::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Duration in whole milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }
}
