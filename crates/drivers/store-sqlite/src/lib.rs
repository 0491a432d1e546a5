#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Stratus Store SQLite Driver
//!
//! Durable implementation of the [`Store`] port on a single SQLite file.
//!
//! Each row keeps the full record as JSON next to the handful of columns
//! needed for lookups, ordering and foreign keys. The schema is applied by
//! embedded migrations when the store opens.
//!
//! Writes are serialised through one in-process gate and run inside a
//! transaction, so the per-function version sequence and the single active
//! version hold under concurrent callers. Reads go straight to the pool.
//!
//! # Examples
//!
//! ```rust,no_run
//! use stratus_function::NewFunction;
//! use stratus_ports::{FunctionRepo, VersionRepo};
//! use stratus_store_sqlite::{SqliteOptions, SqliteStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open(&SqliteOptions::at("stratus.db")).await?;
//! let function = store.create_function(NewFunction::named("hello")).await?;
//! let v1 = store.create_version(function.id, "{}".into(), None).await?;
//! assert!(v1.is_active);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Row, SqliteExecutor};
use stratus_core::{ExecutionId, FunctionId, Page, PageRequest, Pagination, VersionId};
use stratus_execution::{Execution, ExecutionError, ExecutionUpdate, NewExecution};
use stratus_function::{Function, FunctionPatch, FunctionVersion, NewFunction};
use stratus_ports::{ExecutionRepo, FunctionRepo, Store, StoreError, VersionRepo};
use tokio::sync::Mutex;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connection settings for [`SqliteStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteOptions {
    /// Database file; created when missing.
    pub path: PathBuf,
    /// Pool size.
    pub max_connections: u32,
    /// How long a statement waits on a locked database, and how long a
    /// caller waits for a pooled connection.
    pub busy_timeout: Duration,
}

impl SqliteOptions {
    /// Defaults for the given file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::from("stratus.db"),
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// SQLite [`Store`] driver.
pub struct SqliteStore {
    pool: SqlitePool,
    writes: Mutex<()>,
    busy_timeout: Duration,
}

impl SqliteStore {
    /// Open (or create) the database and bring its schema up to date.
    pub async fn open(options: &SqliteOptions) -> Result<Self, StoreError> {
        let connect = SqliteConnectOptions::new()
            .filename(&options.path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(options.busy_timeout);
        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.busy_timeout)
            .connect_with(connect)
            .await
            .map_err(|e| classify(e, "open database", options.busy_timeout))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Internal(format!("schema migration failed: {e}")))?;

        tracing::info!(
            path = %options.path.display(),
            max_connections = options.max_connections,
            "sqlite store ready"
        );
        Ok(Self {
            pool,
            writes: Mutex::new(()),
            busy_timeout: options.busy_timeout,
        })
    }

    /// Close every pooled connection. Later calls fail with
    /// [`StoreError::Connection`].
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn fail(&self, operation: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
        let timeout = self.busy_timeout;
        move |err| classify(err, operation, timeout)
    }
}

fn classify(err: sqlx::Error, operation: &str, timeout: Duration) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut => StoreError::timeout(operation, timeout),
        sqlx::Error::Database(db) if db.message().contains("database is locked") => {
            StoreError::timeout(operation, timeout)
        }
        sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
            StoreError::Connection(format!("{operation}: {err}"))
        }
        _ => StoreError::Internal(format!("{operation}: {err}")),
    }
}

fn encode<T: Serialize>(record: &T) -> Result<String, StoreError> {
    serde_json::to_string(record).map_err(|e| StoreError::Internal(format!("encode record: {e}")))
}

fn decode<T: DeserializeOwned>(row: &SqliteRow) -> Result<T, StoreError> {
    let body: String = row
        .try_get("body")
        .map_err(|e| StoreError::Internal(format!("read record: {e}")))?;
    serde_json::from_str(&body).map_err(|e| StoreError::Internal(format!("decode record: {e}")))
}

/// The `is_active` column is authoritative; the flag in the body is not kept in sync.
fn decode_version(row: &SqliteRow) -> Result<FunctionVersion, StoreError> {
    let mut version: FunctionVersion = decode(row)?;
    version.is_active = row
        .try_get("is_active")
        .map_err(|e| StoreError::Internal(format!("read record: {e}")))?;
    Ok(version)
}

/// Fixed-width UTC text, so comparing columns compares instants.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn page_bounds(page: Pagination) -> (i64, i64) {
    let PageRequest { limit, offset } = page.normalize();
    (limit as i64, offset as i64)
}

async fn load_function<'e>(
    executor: impl SqliteExecutor<'e>,
    id: FunctionId,
) -> Result<Option<Function>, sqlx::Error> {
    let row = sqlx::query("SELECT body FROM functions WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;
    row.map(|row| {
        let body: String = row.try_get("body")?;
        serde_json::from_str(&body).map_err(|e| sqlx::Error::Decode(Box::new(e)))
    })
    .transpose()
}

#[async_trait]
impl FunctionRepo for SqliteStore {
    async fn create_function(&self, new: NewFunction) -> Result<Function, StoreError> {
        let function = new.into_function(FunctionId::v4(), Utc::now())?;
        let _gate = self.writes.lock().await;
        sqlx::query("INSERT INTO functions (id, active_cron, body) VALUES (?, ?, ?)")
            .bind(function.id.to_string())
            .bind(function.has_active_cron())
            .bind(encode(&function)?)
            .execute(&self.pool)
            .await
            .map_err(self.fail("create function"))?;
        tracing::debug!(function_id = %function.id, name = %function.name, "function created");
        Ok(function)
    }

    async fn get_function(&self, id: FunctionId) -> Result<Function, StoreError> {
        load_function(&self.pool, id)
            .await
            .map_err(self.fail("get function"))?
            .ok_or(StoreError::FunctionNotFound(id))
    }

    async fn list_functions(&self, page: Pagination) -> Result<Page<Function>, StoreError> {
        let (limit, offset) = page_bounds(page);
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM functions")
            .fetch_one(&self.pool)
            .await
            .map_err(self.fail("count functions"))?;
        let rows = sqlx::query("SELECT body FROM functions ORDER BY seq DESC LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(self.fail("list functions"))?;
        Ok(Page {
            items: rows.iter().map(decode::<Function>).collect::<Result<_, _>>()?,
            total: total as u64,
        })
    }

    async fn update_function(
        &self,
        id: FunctionId,
        patch: FunctionPatch,
    ) -> Result<Function, StoreError> {
        let _gate = self.writes.lock().await;
        let mut tx = self.pool.begin().await.map_err(self.fail("begin"))?;
        let mut function = load_function(&mut *tx, id)
            .await
            .map_err(self.fail("get function"))?
            .ok_or(StoreError::FunctionNotFound(id))?;
        patch.apply(&mut function, Utc::now())?;

        sqlx::query("UPDATE functions SET active_cron = ?, body = ? WHERE id = ?")
            .bind(function.has_active_cron())
            .bind(encode(&function)?)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(self.fail("update function"))?;
        tx.commit().await.map_err(self.fail("commit"))?;
        Ok(function)
    }

    async fn delete_function(&self, id: FunctionId) -> Result<(), StoreError> {
        let key = id.to_string();
        let _gate = self.writes.lock().await;
        let mut tx = self.pool.begin().await.map_err(self.fail("begin"))?;
        let executions = sqlx::query("DELETE FROM executions WHERE function_id = ?")
            .bind(&key)
            .execute(&mut *tx)
            .await
            .map_err(self.fail("delete executions"))?
            .rows_affected();
        sqlx::query("DELETE FROM versions WHERE function_id = ?")
            .bind(&key)
            .execute(&mut *tx)
            .await
            .map_err(self.fail("delete versions"))?;
        let deleted = sqlx::query("DELETE FROM functions WHERE id = ?")
            .bind(&key)
            .execute(&mut *tx)
            .await
            .map_err(self.fail("delete function"))?
            .rows_affected();
        if deleted == 0 {
            return Err(StoreError::FunctionNotFound(id));
        }
        tx.commit().await.map_err(self.fail("commit"))?;
        tracing::debug!(function_id = %id, executions, "function deleted");
        Ok(())
    }

    async fn list_functions_with_active_cron(&self) -> Result<Vec<Function>, StoreError> {
        let rows = sqlx::query("SELECT body FROM functions WHERE active_cron = 1 ORDER BY seq")
            .fetch_all(&self.pool)
            .await
            .map_err(self.fail("list scheduled functions"))?;
        rows.iter().map(decode::<Function>).collect()
    }
}

#[async_trait]
impl VersionRepo for SqliteStore {
    async fn create_version(
        &self,
        function_id: FunctionId,
        code: String,
        created_by: Option<String>,
    ) -> Result<FunctionVersion, StoreError> {
        let key = function_id.to_string();
        let _gate = self.writes.lock().await;
        let mut tx = self.pool.begin().await.map_err(self.fail("begin"))?;

        let number: i64 = sqlx::query_scalar(
            "UPDATE functions SET version_seq = version_seq + 1 WHERE id = ? RETURNING version_seq",
        )
        .bind(&key)
        .fetch_optional(&mut *tx)
        .await
        .map_err(self.fail("next version number"))?
        .ok_or(StoreError::FunctionNotFound(function_id))?;

        let version = FunctionVersion {
            id: VersionId::v4(),
            function_id,
            version: number as u32,
            code,
            created_by,
            is_active: true,
            created_at: Utc::now(),
        };
        sqlx::query("UPDATE versions SET is_active = 0 WHERE function_id = ? AND is_active = 1")
            .bind(&key)
            .execute(&mut *tx)
            .await
            .map_err(self.fail("deactivate versions"))?;
        sqlx::query(
            "INSERT INTO versions (id, function_id, version, is_active, body) VALUES (?, ?, ?, 1, ?)",
        )
        .bind(version.id.to_string())
        .bind(&key)
        .bind(number)
        .bind(encode(&version)?)
        .execute(&mut *tx)
        .await
        .map_err(self.fail("create version"))?;
        tx.commit().await.map_err(self.fail("commit"))?;

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
        let row = sqlx::query(
            "SELECT body, is_active FROM versions WHERE function_id = ? AND version = ?",
        )
        .bind(function_id.to_string())
        .bind(i64::from(version))
        .fetch_optional(&self.pool)
        .await
        .map_err(self.fail("get version"))?
        .ok_or(StoreError::VersionNumberNotFound {
            function_id,
            version,
        })?;
        decode_version(&row)
    }

    async fn get_version_by_id(&self, id: VersionId) -> Result<FunctionVersion, StoreError> {
        let row = sqlx::query("SELECT body, is_active FROM versions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(self.fail("get version"))?
            .ok_or(StoreError::VersionNotFound(id))?;
        decode_version(&row)
    }

    async fn list_versions(
        &self,
        function_id: FunctionId,
        page: Pagination,
    ) -> Result<Page<FunctionVersion>, StoreError> {
        let key = function_id.to_string();
        let (limit, offset) = page_bounds(page);
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT (SELECT COUNT(*) FROM versions WHERE function_id = f.id) FROM functions f WHERE f.id = ?",
        )
        .bind(&key)
        .fetch_optional(&self.pool)
        .await
        .map_err(self.fail("count versions"))?;
        let total = total.ok_or(StoreError::FunctionNotFound(function_id))?;

        let rows = sqlx::query(
            "SELECT body, is_active FROM versions WHERE function_id = ? \
             ORDER BY version DESC LIMIT ? OFFSET ?",
        )
        .bind(&key)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(self.fail("list versions"))?;
        Ok(Page {
            items: rows.iter().map(decode_version).collect::<Result<_, _>>()?,
            total: total as u64,
        })
    }

    async fn get_active_version(
        &self,
        function_id: FunctionId,
    ) -> Result<FunctionVersion, StoreError> {
        let row = sqlx::query(
            "SELECT body, is_active FROM versions WHERE function_id = ? AND is_active = 1",
        )
        .bind(function_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(self.fail("get active version"))?
        .ok_or(StoreError::NoActiveVersion(function_id))?;
        decode_version(&row)
    }

    async fn activate_version(&self, id: VersionId) -> Result<FunctionVersion, StoreError> {
        let key = id.to_string();
        let _gate = self.writes.lock().await;
        let mut tx = self.pool.begin().await.map_err(self.fail("begin"))?;

        let function_id: String = sqlx::query_scalar("SELECT function_id FROM versions WHERE id = ?")
            .bind(&key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(self.fail("get version"))?
            .ok_or(StoreError::VersionNotFound(id))?;
        // Two statements: the one-active index is checked row by row.
        sqlx::query("UPDATE versions SET is_active = 0 WHERE function_id = ? AND is_active = 1")
            .bind(&function_id)
            .execute(&mut *tx)
            .await
            .map_err(self.fail("deactivate versions"))?;
        let row = sqlx::query("UPDATE versions SET is_active = 1 WHERE id = ? RETURNING body, is_active")
            .bind(&key)
            .fetch_one(&mut *tx)
            .await
            .map_err(self.fail("activate version"))?;
        let version = decode_version(&row)?;
        tx.commit().await.map_err(self.fail("commit"))?;
        Ok(version)
    }

    async fn delete_version(&self, id: VersionId) -> Result<(), StoreError> {
        let key = id.to_string();
        let _gate = self.writes.lock().await;
        let mut tx = self.pool.begin().await.map_err(self.fail("begin"))?;

        let is_active: bool = sqlx::query_scalar("SELECT is_active FROM versions WHERE id = ?")
            .bind(&key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(self.fail("get version"))?
            .ok_or(StoreError::VersionNotFound(id))?;
        if is_active {
            return Err(StoreError::CannotDeleteActiveVersion(id));
        }
        let executions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM executions WHERE version_id = ?")
            .bind(&key)
            .fetch_one(&mut *tx)
            .await
            .map_err(self.fail("count executions"))?;
        if executions > 0 {
            return Err(StoreError::VersionInUse {
                version_id: id,
                executions: executions as usize,
            });
        }
        sqlx::query("DELETE FROM versions WHERE id = ?")
            .bind(&key)
            .execute(&mut *tx)
            .await
            .map_err(self.fail("delete version"))?;
        tx.commit().await.map_err(self.fail("commit"))?;
        Ok(())
    }
}

#[async_trait]
impl ExecutionRepo for SqliteStore {
    async fn create_execution(&self, new: NewExecution) -> Result<Execution, StoreError> {
        let _gate = self.writes.lock().await;
        let mut tx = self.pool.begin().await.map_err(self.fail("begin"))?;

        let function: Option<i64> = sqlx::query_scalar("SELECT 1 FROM functions WHERE id = ?")
            .bind(new.function_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(self.fail("get function"))?;
        if function.is_none() {
            return Err(StoreError::FunctionNotFound(new.function_id));
        }
        let version: Option<i64> = sqlx::query_scalar("SELECT 1 FROM versions WHERE id = ?")
            .bind(new.version_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(self.fail("get version"))?;
        if version.is_none() {
            return Err(StoreError::VersionNotFound(new.version_id));
        }

        let execution = new.into_execution(Utc::now());
        sqlx::query(
            "INSERT INTO executions (id, function_id, version_id, created_at, body) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(execution.id.to_string())
        .bind(execution.function_id.to_string())
        .bind(execution.version_id.to_string())
        .bind(timestamp(execution.created_at))
        .bind(encode(&execution)?)
        .execute(&mut *tx)
        .await
        .map_err(self.fail("create execution"))?;
        tx.commit().await.map_err(self.fail("commit"))?;
        Ok(execution)
    }

    async fn get_execution(&self, id: ExecutionId) -> Result<Execution, StoreError> {
        let row = sqlx::query("SELECT body FROM executions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(self.fail("get execution"))?
            .ok_or(StoreError::ExecutionNotFound(id))?;
        decode(&row)
    }

    async fn update_execution(
        &self,
        id: ExecutionId,
        update: ExecutionUpdate,
    ) -> Result<Execution, StoreError> {
        let key = id.to_string();
        let _gate = self.writes.lock().await;
        let mut tx = self.pool.begin().await.map_err(self.fail("begin"))?;

        let row = sqlx::query("SELECT body FROM executions WHERE id = ?")
            .bind(&key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(self.fail("get execution"))?
            .ok_or(StoreError::ExecutionNotFound(id))?;
        let mut execution: Execution = decode(&row)?;
        execution.finish(update).map_err(|err| match err {
            ExecutionError::InvalidTransition { from, to } => StoreError::InvalidTransition {
                execution_id: id,
                from,
                to,
            },
            other => StoreError::Internal(other.to_string()),
        })?;

        sqlx::query("UPDATE executions SET body = ? WHERE id = ?")
            .bind(encode(&execution)?)
            .bind(&key)
            .execute(&mut *tx)
            .await
            .map_err(self.fail("update execution"))?;
        tx.commit().await.map_err(self.fail("commit"))?;
        Ok(execution)
    }

    async fn list_executions(
        &self,
        function_id: FunctionId,
        page: Pagination,
    ) -> Result<Page<Execution>, StoreError> {
        let key = function_id.to_string();
        let (limit, offset) = page_bounds(page);
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM executions WHERE function_id = ?")
            .bind(&key)
            .fetch_one(&self.pool)
            .await
            .map_err(self.fail("count executions"))?;
        let rows = sqlx::query(
            "SELECT body FROM executions WHERE function_id = ? ORDER BY seq DESC LIMIT ? OFFSET ?",
        )
        .bind(&key)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(self.fail("list executions"))?;
        Ok(Page {
            items: rows.iter().map(decode::<Execution>).collect::<Result<_, _>>()?,
            total: total as u64,
        })
    }

    async fn delete_old_executions(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let _gate = self.writes.lock().await;
        let result = sqlx::query("DELETE FROM executions WHERE created_at < ?")
            .bind(timestamp(before))
            .execute(&self.pool)
            .await
            .map_err(self.fail("purge executions"))?;
        Ok(result.rows_affected())
    }

    async fn delete_function_executions_before(
        &self,
        function_id: FunctionId,
        before: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let _gate = self.writes.lock().await;
        let result = sqlx::query("DELETE FROM executions WHERE function_id = ? AND created_at < ?")
            .bind(function_id.to_string())
            .bind(timestamp(before))
            .execute(&self.pool)
            .await
            .map_err(self.fail("purge executions"))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(self.fail("ping"))?;
        Ok(())
    }
}
