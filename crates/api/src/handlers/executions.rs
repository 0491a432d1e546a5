//! Execution history routes.

use axum::Json;
use axum::extract::{Path, Query, State};
use stratus_core::{ExecutionId, FunctionId, Page, Pagination};
use stratus_execution::Execution;
use stratus_ports::{ExecutionRepo, FunctionRepo};

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /api/functions/{function_id}/executions`, newest first.
pub async fn list(
    State(state): State<AppState>,
    Path(function_id): Path<FunctionId>,
    Query(page): Query<Pagination>,
) -> Result<Json<Page<Execution>>, ApiError> {
    // Unknown functions answer 404 rather than an empty page.
    state.store.get_function(function_id).await?;
    Ok(Json(state.store.list_executions(function_id, page).await?))
}

/// `GET /api/executions/{execution_id}`
pub async fn get(
    State(state): State<AppState>,
    Path(execution_id): Path<ExecutionId>,
) -> Result<Json<Execution>, ApiError> {
    Ok(Json(state.store.get_execution(execution_id).await?))
}
