//! The persisted execution record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stratus_core::{ExecutionId, FunctionId, VersionId};

use crate::error::ExecutionError;
use crate::status::{ExecutionStatus, Trigger};
use crate::transition::validate_transition;

/// One recorded invocation attempt.
///
/// `version_id` points at the version that actually ran, not whichever
/// version happens to be active later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    /// Unique identifier.
    pub id: ExecutionId,
    /// Owning function.
    pub function_id: FunctionId,
    /// Version that ran.
    pub version_id: VersionId,
    /// Current status.
    pub status: ExecutionStatus,
    /// Wall-clock duration of the runtime call.
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Failure text for `error` executions.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Masked snapshot of the triggering event.
    #[serde(default)]
    pub event_json: Option<String>,
    /// Masked, size-capped snapshot of the response.
    #[serde(default)]
    pub response_json: Option<String>,
    /// What caused the execution.
    pub trigger: Trigger,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl Execution {
    /// Apply the single final update.
    ///
    /// Fails without modifying the record if the status transition is invalid.
    pub fn finish(&mut self, update: ExecutionUpdate) -> Result<(), ExecutionError> {
        validate_transition(self.status, update.status)?;
        self.status = update.status;
        self.duration_ms = update.duration_ms;
        self.error_message = update.error_message;
        self.response_json = update.response_json;
        Ok(())
    }
}

/// Input for recording a new `pending` execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExecution {
    /// Pre-generated identifier.
    pub id: ExecutionId,
    /// Owning function.
    pub function_id: FunctionId,
    /// Version about to run.
    pub version_id: VersionId,
    /// What caused the execution.
    pub trigger: Trigger,
    /// Masked event snapshot.
    pub event_json: Option<String>,
}

impl NewExecution {
    /// Materialize into a `pending` [`Execution`].
    #[must_use]
    pub fn into_execution(self, now: DateTime<Utc>) -> Execution {
        Execution {
            id: self.id,
            function_id: self.function_id,
            version_id: self.version_id,
            status: ExecutionStatus::Pending,
            duration_ms: None,
            error_message: None,
            event_json: self.event_json,
            response_json: None,
            trigger: self.trigger,
            created_at: now,
        }
    }
}

/// The final update written once the runtime call has returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionUpdate {
    /// Final status.
    pub status: ExecutionStatus,
    /// Measured duration.
    pub duration_ms: Option<u64>,
    /// Failure text.
    pub error_message: Option<String>,
    /// Response snapshot.
    pub response_json: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Execution {
        NewExecution {
            id: ExecutionId::v4(),
            function_id: FunctionId::v4(),
            version_id: VersionId::v4(),
            trigger: Trigger::Http,
            event_json: Some("{}".into()),
        }
        .into_execution(Utc::now())
    }

    #[test]
    fn new_execution_is_pending() {
        let exec = pending();
        assert_eq!(exec.status, ExecutionStatus::Pending);
        assert!(exec.duration_ms.is_none());
        assert!(exec.response_json.is_none());
    }

    #[test]
    fn finish_applies_once() {
        let mut exec = pending();
        exec.finish(ExecutionUpdate {
            status: ExecutionStatus::Error,
            duration_ms: Some(12),
            error_message: Some("boom".into()),
            response_json: None,
        })
        .unwrap();
        assert_eq!(exec.status, ExecutionStatus::Error);
        assert_eq!(exec.duration_ms, Some(12));

        let second = exec.finish(ExecutionUpdate {
            status: ExecutionStatus::Success,
            duration_ms: Some(1),
            error_message: None,
            response_json: None,
        });
        assert!(second.is_err());
        assert_eq!(exec.status, ExecutionStatus::Error);
        assert_eq!(exec.error_message.as_deref(), Some("boom"));
    }
}
