#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Stratus Store Memory Driver
//!
//! In-memory implementation of the [`Store`] port.
//!
//! All state sits behind one `tokio::sync::Mutex`, so every mutation is a
//! single critical section: concurrent `create_version` calls on the same
//! function can never observe the same next number or leave two versions
//! active. Nothing is persisted; suitable for tests and single-process
//! deployments.
//!
//! # Examples
//!
//! ```rust,no_run
//! use stratus_function::NewFunction;
//! use stratus_ports::{FunctionRepo, VersionRepo};
//! use stratus_store_memory::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let function = store.create_function(NewFunction::named("hello")).await?;
//! let v1 = store.create_version(function.id, "{}".into(), None).await?;
//! assert!(v1.is_active);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use stratus_core::{ExecutionId, FunctionId, Page, Pagination, VersionId};
use stratus_execution::{Execution, ExecutionError, ExecutionUpdate, NewExecution};
use stratus_function::{Function, FunctionPatch, FunctionVersion, NewFunction};
use stratus_ports::{ExecutionRepo, FunctionRepo, Store, StoreError, VersionRepo};
use tokio::sync::Mutex;

/// Everything the store holds. Maps keep insertion order, which doubles as
/// creation order for newest-first listing.
#[derive(Default)]
struct State {
    functions: IndexMap<FunctionId, Function>,
    versions: IndexMap<VersionId, FunctionVersion>,
    executions: IndexMap<ExecutionId, Execution>,
    /// Highest version number ever issued per function; numbers are never reused.
    version_seq: HashMap<FunctionId, u32>,
}

impl State {
    fn function(&self, id: FunctionId) -> Result<&Function, StoreError> {
        self.functions.get(&id).ok_or(StoreError::FunctionNotFound(id))
    }

    fn versions_of(&self, function_id: FunctionId) -> impl Iterator<Item = &FunctionVersion> {
        self.versions
            .values()
            .filter(move |v| v.function_id == function_id)
    }

    fn set_active(&mut self, function_id: FunctionId, active: VersionId) {
        for v in self.versions.values_mut() {
            if v.function_id == function_id {
                v.is_active = v.id == active;
            }
        }
    }

    fn purge_executions(&mut self, keep: impl Fn(&Execution) -> bool) -> u64 {
        let before = self.executions.len();
        self.executions.retain(|_, e| keep(e));
        (before - self.executions.len()) as u64
    }
}

/// In-memory [`Store`] driver.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FunctionRepo for MemoryStore {
    async fn create_function(&self, new: NewFunction) -> Result<Function, StoreError> {
        let function = new.into_function(FunctionId::v4(), Utc::now())?;
        let mut state = self.state.lock().await;
        state.functions.insert(function.id, function.clone());
        tracing::debug!(function_id = %function.id, name = %function.name, "function created");
        Ok(function)
    }

    async fn get_function(&self, id: FunctionId) -> Result<Function, StoreError> {
        self.state.lock().await.function(id).cloned()
    }

    async fn list_functions(&self, page: Pagination) -> Result<Page<Function>, StoreError> {
        let state = self.state.lock().await;
        let all: Vec<Function> = state.functions.values().rev().cloned().collect();
        Ok(page.normalize().apply(all))
    }

    async fn update_function(
        &self,
        id: FunctionId,
        patch: FunctionPatch,
    ) -> Result<Function, StoreError> {
        let mut state = self.state.lock().await;
        let function = state
            .functions
            .get_mut(&id)
            .ok_or(StoreError::FunctionNotFound(id))?;
        patch.apply(function, Utc::now())?;
        Ok(function.clone())
    }

    async fn delete_function(&self, id: FunctionId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.functions.shift_remove(&id).is_none() {
            return Err(StoreError::FunctionNotFound(id));
        }
        state.versions.retain(|_, v| v.function_id != id);
        let executions = state.purge_executions(|e| e.function_id != id);
        state.version_seq.remove(&id);
        tracing::debug!(function_id = %id, executions, "function deleted");
        Ok(())
    }

    async fn list_functions_with_active_cron(&self) -> Result<Vec<Function>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .functions
            .values()
            .filter(|f| f.has_active_cron())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl VersionRepo for MemoryStore {
    async fn create_version(
        &self,
        function_id: FunctionId,
        code: String,
        created_by: Option<String>,
    ) -> Result<FunctionVersion, StoreError> {
        let mut state = self.state.lock().await;
        state.function(function_id)?;

        let seq = state.version_seq.entry(function_id).or_insert(0);
        *seq += 1;
        let version = FunctionVersion {
            id: VersionId::v4(),
            function_id,
            version: *seq,
            code,
            created_by,
            is_active: true,
            created_at: Utc::now(),
        };
        state.set_active(function_id, version.id);
        state.versions.insert(version.id, version.clone());
        tracing::debug!(
            function_id = %function_id,
            version = version.version,
            "version created and activated"
        );
        Ok(version)
    }

    async fn get_version(
        &self,
        function_id: FunctionId,
        version: u32,
    ) -> Result<FunctionVersion, StoreError> {
        let state = self.state.lock().await;
        state
            .versions_of(function_id)
            .find(|v| v.version == version)
            .cloned()
            .ok_or(StoreError::VersionNumberNotFound {
                function_id,
                version,
            })
    }

    async fn get_version_by_id(&self, id: VersionId) -> Result<FunctionVersion, StoreError> {
        let state = self.state.lock().await;
        state
            .versions
            .get(&id)
            .cloned()
            .ok_or(StoreError::VersionNotFound(id))
    }

    async fn list_versions(
        &self,
        function_id: FunctionId,
        page: Pagination,
    ) -> Result<Page<FunctionVersion>, StoreError> {
        let state = self.state.lock().await;
        state.function(function_id)?;
        let mut all: Vec<FunctionVersion> = state.versions_of(function_id).cloned().collect();
        all.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(page.normalize().apply(all))
    }

    async fn get_active_version(
        &self,
        function_id: FunctionId,
    ) -> Result<FunctionVersion, StoreError> {
        let state = self.state.lock().await;
        state
            .versions_of(function_id)
            .find(|v| v.is_active)
            .cloned()
            .ok_or(StoreError::NoActiveVersion(function_id))
    }

    async fn activate_version(&self, id: VersionId) -> Result<FunctionVersion, StoreError> {
        let mut state = self.state.lock().await;
        let function_id = state
            .versions
            .get(&id)
            .map(|v| v.function_id)
            .ok_or(StoreError::VersionNotFound(id))?;
        state.set_active(function_id, id);
        state
            .versions
            .get(&id)
            .cloned()
            .ok_or(StoreError::VersionNotFound(id))
    }

    async fn delete_version(&self, id: VersionId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let version = state.versions.get(&id).ok_or(StoreError::VersionNotFound(id))?;
        if version.is_active {
            return Err(StoreError::CannotDeleteActiveVersion(id));
        }
        let executions = state
            .executions
            .values()
            .filter(|e| e.version_id == id)
            .count();
        if executions > 0 {
            return Err(StoreError::VersionInUse {
                version_id: id,
                executions,
            });
        }
        state.versions.shift_remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ExecutionRepo for MemoryStore {
    async fn create_execution(&self, new: NewExecution) -> Result<Execution, StoreError> {
        let mut state = self.state.lock().await;
        state.function(new.function_id)?;
        if !state.versions.contains_key(&new.version_id) {
            return Err(StoreError::VersionNotFound(new.version_id));
        }
        let execution = new.into_execution(Utc::now());
        state.executions.insert(execution.id, execution.clone());
        Ok(execution)
    }

    async fn get_execution(&self, id: ExecutionId) -> Result<Execution, StoreError> {
        let state = self.state.lock().await;
        state
            .executions
            .get(&id)
            .cloned()
            .ok_or(StoreError::ExecutionNotFound(id))
    }

    async fn update_execution(
        &self,
        id: ExecutionId,
        update: ExecutionUpdate,
    ) -> Result<Execution, StoreError> {
        let mut state = self.state.lock().await;
        let execution = state
            .executions
            .get_mut(&id)
            .ok_or(StoreError::ExecutionNotFound(id))?;
        execution.finish(update).map_err(|err| match err {
            ExecutionError::InvalidTransition { from, to } => StoreError::InvalidTransition {
                execution_id: id,
                from,
                to,
            },
            other => StoreError::Internal(other.to_string()),
        })?;
        Ok(execution.clone())
    }

    async fn list_executions(
        &self,
        function_id: FunctionId,
        page: Pagination,
    ) -> Result<Page<Execution>, StoreError> {
        let state = self.state.lock().await;
        let all: Vec<Execution> = state
            .executions
            .values()
            .rev()
            .filter(|e| e.function_id == function_id)
            .cloned()
            .collect();
        Ok(page.normalize().apply(all))
    }

    async fn delete_old_executions(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.purge_executions(|e| e.created_at >= before))
    }

    async fn delete_function_executions_before(
        &self,
        function_id: FunctionId,
        before: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.purge_executions(|e| e.function_id != function_id || e.created_at >= before))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        drop(self.state.lock().await);
        Ok(())
    }
}
