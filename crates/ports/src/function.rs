//! Function repository port.

use async_trait::async_trait;
use stratus_core::{FunctionId, Page, Pagination};
use stratus_function::{Function, FunctionPatch, NewFunction};

use crate::error::StoreError;

/// Persistence interface for function definitions.
#[async_trait]
pub trait FunctionRepo: Send + Sync {
    /// Validate and insert a new function under a freshly generated id.
    async fn create_function(&self, new: NewFunction) -> Result<Function, StoreError>;

    /// Fetch a function. Fails with [`StoreError::FunctionNotFound`].
    async fn get_function(&self, id: FunctionId) -> Result<Function, StoreError>;

    /// Page through functions, newest first, with the total count.
    async fn list_functions(&self, page: Pagination) -> Result<Page<Function>, StoreError>;

    /// Apply a partial update; only supplied fields change.
    async fn update_function(
        &self,
        id: FunctionId,
        patch: FunctionPatch,
    ) -> Result<Function, StoreError>;

    /// Delete a function together with all of its versions and executions.
    async fn delete_function(&self, id: FunctionId) -> Result<(), StoreError>;

    /// Functions with `cron_status = active` and a non-empty schedule.
    async fn list_functions_with_active_cron(&self) -> Result<Vec<Function>, StoreError>;
}
