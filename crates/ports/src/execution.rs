//! Execution repository port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stratus_core::{ExecutionId, FunctionId, Page, Pagination};
use stratus_execution::{Execution, ExecutionUpdate, NewExecution};

use crate::error::StoreError;

/// Persistence interface for execution records.
///
/// A record is created `pending` and finalised exactly once; a second
/// update fails with [`StoreError::InvalidTransition`].
#[async_trait]
pub trait ExecutionRepo: Send + Sync {
    /// Insert a `pending` record.
    async fn create_execution(&self, new: NewExecution) -> Result<Execution, StoreError>;

    /// Fetch a record. Fails with [`StoreError::ExecutionNotFound`].
    async fn get_execution(&self, id: ExecutionId) -> Result<Execution, StoreError>;

    /// Write the final status, duration, error and response snapshot.
    async fn update_execution(
        &self,
        id: ExecutionId,
        update: ExecutionUpdate,
    ) -> Result<Execution, StoreError>;

    /// Page through a function's executions, newest first.
    async fn list_executions(
        &self,
        function_id: FunctionId,
        page: Pagination,
    ) -> Result<Page<Execution>, StoreError>;

    /// Remove every execution created before `before`; returns the count.
    async fn delete_old_executions(&self, before: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Remove one function's executions created before `before`.
    async fn delete_function_executions_before(
        &self,
        function_id: FunctionId,
        before: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
}
