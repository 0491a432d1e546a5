//! Version repository port.

use async_trait::async_trait;
use stratus_core::{FunctionId, Page, Pagination, VersionId};
use stratus_function::FunctionVersion;

use crate::error::StoreError;

/// Persistence interface for function versions.
///
/// Implementations must make `create_version` and `activate_version` atomic
/// per function: once a function has a version, exactly one is active, and
/// version numbers run 1..N without gaps or duplicates.
#[async_trait]
pub trait VersionRepo: Send + Sync {
    /// Insert version `max + 1` and make it the only active one.
    ///
    /// Fails with [`StoreError::FunctionNotFound`] if the function is absent.
    async fn create_version(
        &self,
        function_id: FunctionId,
        code: String,
        created_by: Option<String>,
    ) -> Result<FunctionVersion, StoreError>;

    /// Look up a version by its per-function number.
    async fn get_version(
        &self,
        function_id: FunctionId,
        version: u32,
    ) -> Result<FunctionVersion, StoreError>;

    /// Look up a version by id.
    async fn get_version_by_id(&self, id: VersionId) -> Result<FunctionVersion, StoreError>;

    /// Page through a function's versions, highest number first.
    async fn list_versions(
        &self,
        function_id: FunctionId,
        page: Pagination,
    ) -> Result<Page<FunctionVersion>, StoreError>;

    /// The active version. Fails with [`StoreError::NoActiveVersion`].
    async fn get_active_version(&self, function_id: FunctionId)
    -> Result<FunctionVersion, StoreError>;

    /// Make `id` the only active version of its function.
    async fn activate_version(&self, id: VersionId) -> Result<FunctionVersion, StoreError>;

    /// Delete a non-active version that no execution references.
    ///
    /// Fails with [`StoreError::CannotDeleteActiveVersion`] or
    /// [`StoreError::VersionInUse`] and leaves state unchanged.
    async fn delete_version(&self, id: VersionId) -> Result<(), StoreError>;
}
