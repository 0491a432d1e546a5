//! Router assembly.

use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{self, executions, functions, system, versions};
use crate::state::AppState;

/// Transport limits.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Timeout of management requests. The entry point is bounded by the
    /// engine's execution budget instead.
    pub request_timeout: Duration,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            max_body_bytes: 6 * 1024 * 1024,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState, config: &RouterConfig) -> Router {
    let entry = Router::new()
        .route(
            "/fn/{function_id}",
            get(handlers::invoke_root)
                .post(handlers::invoke_root)
                .put(handlers::invoke_root)
                .delete(handlers::invoke_root),
        )
        .route(
            "/fn/{function_id}/{*rest}",
            get(handlers::invoke)
                .post(handlers::invoke)
                .put(handlers::invoke)
                .delete(handlers::invoke),
        )
        .with_state(state.clone());

    let management = Router::new()
        .route("/functions", get(functions::list).post(functions::create))
        .route(
            "/functions/{function_id}",
            get(functions::get)
                .patch(functions::update)
                .delete(functions::delete),
        )
        .route("/functions/{function_id}/cron", get(functions::cron))
        .route(
            "/functions/{function_id}/versions",
            get(versions::list).post(versions::create),
        )
        .route(
            "/functions/{function_id}/versions/{version}",
            get(versions::get).delete(versions::delete),
        )
        .route(
            "/functions/{function_id}/versions/{version}/activate",
            post(versions::activate),
        )
        .route(
            "/functions/{function_id}/executions",
            get(executions::list),
        )
        .route("/executions/{execution_id}", get(executions::get))
        .route("/cron/next", get(system::cron_preview))
        .route("/metrics", get(system::metrics))
        .with_state(state.clone())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ));

    Router::new()
        .route("/health", get(system::health))
        .with_state(state)
        .nest("/api", management)
        .merge(entry)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
}
