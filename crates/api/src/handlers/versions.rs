//! `/api/functions/{function_id}/versions` routes.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use stratus_core::{FunctionId, Page, Pagination};
use stratus_function::FunctionVersion;
use stratus_ports::VersionRepo;

use crate::error::ApiError;
use crate::state::AppState;

/// Body of `POST .../versions`.
#[derive(Debug, Deserialize)]
pub struct NewVersion {
    /// Source code of the snapshot.
    pub code: String,
    /// Author, free text.
    #[serde(default)]
    pub created_by: Option<String>,
}

/// `POST /api/functions/{function_id}/versions`
///
/// The new version becomes the active one.
pub async fn create(
    State(state): State<AppState>,
    Path(function_id): Path<FunctionId>,
    Json(input): Json<NewVersion>,
) -> Result<(StatusCode, Json<FunctionVersion>), ApiError> {
    let version = state
        .store
        .create_version(function_id, input.code, input.created_by)
        .await?;
    tracing::info!(%function_id, version = version.version, "version created");
    Ok((StatusCode::CREATED, Json(version)))
}

/// `GET /api/functions/{function_id}/versions`
pub async fn list(
    State(state): State<AppState>,
    Path(function_id): Path<FunctionId>,
    Query(page): Query<Pagination>,
) -> Result<Json<Page<FunctionVersion>>, ApiError> {
    Ok(Json(state.store.list_versions(function_id, page).await?))
}

/// `GET /api/functions/{function_id}/versions/{version}`
pub async fn get(
    State(state): State<AppState>,
    Path((function_id, version)): Path<(FunctionId, u32)>,
) -> Result<Json<FunctionVersion>, ApiError> {
    Ok(Json(state.store.get_version(function_id, version).await?))
}

/// `POST /api/functions/{function_id}/versions/{version}/activate`
pub async fn activate(
    State(state): State<AppState>,
    Path((function_id, version)): Path<(FunctionId, u32)>,
) -> Result<Json<FunctionVersion>, ApiError> {
    let target = state.store.get_version(function_id, version).await?;
    let active = state.store.activate_version(target.id).await?;
    tracing::info!(%function_id, version, "version activated");
    Ok(Json(active))
}

/// `DELETE /api/functions/{function_id}/versions/{version}`
///
/// Refused for the active version and for versions with execution history.
pub async fn delete(
    State(state): State<AppState>,
    Path((function_id, version)): Path<(FunctionId, u32)>,
) -> Result<StatusCode, ApiError> {
    let target = state.store.get_version(function_id, version).await?;
    state.store.delete_version(target.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
