//! Scheduler error types.

use stratus_core::FunctionId;
use stratus_function::FunctionError;
use stratus_ports::StoreError;

/// Errors from the scheduler and sweeper.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A cron expression did not parse.
    #[error(transparent)]
    InvalidSchedule(#[from] FunctionError),

    /// The self-trigger request could not be sent or read.
    #[error("trigger request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The entry point answered a self-trigger with a non-2xx status.
    #[error("trigger for function {function_id} rejected with status {status}")]
    TriggerRejected {
        /// The function that was triggered.
        function_id: FunctionId,
        /// Status the entry point answered with.
        status: u16,
    },
}
