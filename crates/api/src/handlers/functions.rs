//! `/api/functions` management routes.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use stratus_core::{FunctionId, Page, Pagination};
use stratus_function::{CronStatus, Function, FunctionPatch, NewFunction};
use stratus_ports::FunctionRepo;

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /api/functions`
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<NewFunction>,
) -> Result<(StatusCode, Json<Function>), ApiError> {
    let function = state.store.create_function(input).await?;
    tracing::info!(function_id = %function.id, name = %function.name, "function created");
    if function.has_active_cron() {
        state.refresh_cron(function.id).await;
    }
    Ok((StatusCode::CREATED, Json(function)))
}

/// `GET /api/functions`
pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Page<Function>>, ApiError> {
    Ok(Json(state.store.list_functions(page).await?))
}

/// `GET /api/functions/{function_id}`
pub async fn get(
    State(state): State<AppState>,
    Path(function_id): Path<FunctionId>,
) -> Result<Json<Function>, ApiError> {
    Ok(Json(state.store.get_function(function_id).await?))
}

/// `PATCH /api/functions/{function_id}`
///
/// A patch touching `cron_schedule` or `cron_status` re-syncs the timer, as
/// does a rename of a scheduled function since fires carry its name.
pub async fn update(
    State(state): State<AppState>,
    Path(function_id): Path<FunctionId>,
    Json(patch): Json<FunctionPatch>,
) -> Result<Json<Function>, ApiError> {
    let touches_cron = patch.touches_cron();
    let renamed = patch.name.is_some();
    let function = state.store.update_function(function_id, patch).await?;
    if touches_cron || (renamed && function.has_active_cron()) {
        state.refresh_cron(function_id).await;
    }
    Ok(Json(function))
}

/// `DELETE /api/functions/{function_id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(function_id): Path<FunctionId>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_function(function_id).await?;
    tracing::info!(%function_id, "function deleted");
    state.refresh_cron(function_id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Cron state of one function.
#[derive(Debug, Serialize)]
pub struct CronInfo {
    /// The function.
    pub function_id: FunctionId,
    /// Stored expression.
    pub schedule: Option<String>,
    /// Stored status.
    pub status: Option<CronStatus>,
    /// Whether a timer is live.
    pub registered: bool,
    /// Next fire of the live timer.
    pub next_run: Option<DateTime<Utc>>,
}

/// `GET /api/functions/{function_id}/cron`
pub async fn cron(
    State(state): State<AppState>,
    Path(function_id): Path<FunctionId>,
) -> Result<Json<CronInfo>, ApiError> {
    let function = state.store.get_function(function_id).await?;
    let (registered, next_run) = match &state.scheduler {
        Some(scheduler) => (
            scheduler.is_registered(function_id).await,
            scheduler.next_run(function_id).await,
        ),
        None => (false, None),
    };
    Ok(Json(CronInfo {
        function_id,
        schedule: function.cron_schedule,
        status: function.cron_status,
        registered,
        next_run,
    }))
}
