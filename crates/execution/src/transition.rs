//! State machine transition validation for executions.
//!
//! An execution is written as `pending` and finalized exactly once.

use crate::error::ExecutionError;
use crate::status::ExecutionStatus;

/// Returns `true` if the transition from `from` to `to` is valid.
#[must_use]
pub fn can_transition(from: ExecutionStatus, to: ExecutionStatus) -> bool {
    matches!(
        (from, to),
        (ExecutionStatus::Pending, ExecutionStatus::Success)
            | (ExecutionStatus::Pending, ExecutionStatus::Error)
    )
}

/// Validate a transition, returning an error if invalid.
pub fn validate_transition(from: ExecutionStatus, to: ExecutionStatus) -> Result<(), ExecutionError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(ExecutionError::invalid_transition(from, to))
    }
}
