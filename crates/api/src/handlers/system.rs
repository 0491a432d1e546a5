//! Health, metrics and cron preview.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use stratus_ports::Store;
use stratus_telemetry::MetricsSnapshot;

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(error) => {
            tracing::warn!(%error, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "error": error.to_string() })),
            )
        }
    }
}

/// `GET /api/metrics`
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Query of `GET /api/cron/next`.
#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    /// Raw cron expression.
    pub expression: String,
    /// Reference time; defaults to now.
    #[serde(default)]
    pub after: Option<DateTime<Utc>>,
}

/// Answer of `GET /api/cron/next`.
#[derive(Debug, Serialize)]
pub struct Preview {
    /// The expression as received.
    pub expression: String,
    /// Next occurrence, if the schedule fires again.
    pub next_run: Option<DateTime<Utc>>,
}

/// `GET /api/cron/next?expression=...`
pub async fn cron_preview(Query(query): Query<PreviewQuery>) -> Result<Json<Preview>, ApiError> {
    let after = query.after.unwrap_or_else(Utc::now);
    let next_run = stratus_scheduler::next_run(&query.expression, &after)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(Preview {
        expression: query.expression,
        next_run,
    }))
}
