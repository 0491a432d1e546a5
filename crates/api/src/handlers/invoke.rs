//! The `/fn/{function_id}` entry point.
//!
//! The engine call runs in its own task so a client that disconnects
//! mid-request cannot drop the orchestration before the execution record is
//! finalised.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use stratus_core::FunctionId;
use stratus_engine::{ExecuteRequest, ExecutionOutcome, ExecutionResult};
use stratus_execution::{HttpEvent, HttpResponse, Trigger};
use stratus_masking::mask_log_message;
use stratus_scheduler::headers::TRIGGER;

use crate::error::ApiError;
use crate::headers;
use crate::state::AppState;

/// `ANY /fn/{function_id}`
pub async fn invoke_root(
    State(state): State<AppState>,
    Path(function_id): Path<FunctionId>,
    method: Method,
    uri: Uri,
    request_headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    run(state, function_id, method, uri, request_headers, body).await
}

/// `ANY /fn/{function_id}/{*rest}`
pub async fn invoke(
    State(state): State<AppState>,
    Path((function_id, _rest)): Path<(FunctionId, String)>,
    method: Method,
    uri: Uri,
    request_headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    run(state, function_id, method, uri, request_headers, body).await
}

async fn run(
    state: AppState,
    function_id: FunctionId,
    method: Method,
    uri: Uri,
    request_headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let trigger = Trigger::from_header(
        request_headers
            .get(TRIGGER)
            .and_then(|value| value.to_str().ok()),
    );
    let event = http_event(&method, &uri, &request_headers, &body);
    let request = ExecuteRequest::http(function_id, event).with_trigger(trigger);

    let engine = Arc::clone(&state.engine);
    let result = tokio::spawn(async move { engine.execute(request).await })
        .await
        .map_err(|e| ApiError::Internal(format!("execution task failed: {e}")))??;
    Ok(render(result))
}

/// Build the runtime event from the raw request.
pub fn http_event(method: &Method, uri: &Uri, request_headers: &HeaderMap, body: &Bytes) -> HttpEvent {
    let mut event = HttpEvent::new(method.as_str(), uri.path());
    for (name, value) in request_headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        event
            .headers
            .entry(name.as_str().to_owned())
            .and_modify(|joined| {
                joined.push_str(", ");
                joined.push_str(&value);
            })
            .or_insert_with(|| value.clone().into_owned());
    }
    if let Some(query) = uri.query() {
        event.query = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
    }
    event.body = String::from_utf8_lossy(body).into_owned();
    event
}

fn render(result: ExecutionResult) -> Response {
    let duration_ms = result.duration_ms();
    let ExecutionResult {
        execution_id,
        function_id,
        version_id,
        response,
        outcome,
        ..
    } = result;

    let mut rendered = match (outcome, response) {
        (ExecutionOutcome::Failed { error }, _) => {
            let status = if error.is_timeout() {
                StatusCode::GATEWAY_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            let message = mask_log_message(&error.to_string());
            (status, Json(serde_json::json!({ "error": message }))).into_response()
        }
        (_, Some(response)) => function_response(response),
        (_, None) => function_response(HttpResponse::new(200, "")),
    };

    let out = rendered.headers_mut();
    for (name, value) in [
        (headers::FUNCTION_ID, function_id.to_string()),
        (headers::FUNCTION_VERSION_ID, version_id.to_string()),
        (headers::EXECUTION_ID, execution_id.to_string()),
        (headers::EXECUTION_DURATION_MS, duration_ms.to_string()),
    ] {
        if let Ok(value) = HeaderValue::from_str(&value) {
            out.insert(HeaderName::from_static(name), value);
        }
    }
    rendered
}

fn function_response(response: HttpResponse) -> Response {
    let status = StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::OK);
    let mut rendered = Response::new(Body::from(response.body));
    *rendered.status_mut() = status;

    let out = rendered.headers_mut();
    for (name, value) in &response.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                out.append(name, value);
            }
            _ => tracing::debug!(header = %name, "dropping invalid response header"),
        }
    }
    if !out.contains_key(header::CONTENT_TYPE) {
        out.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn event_joins_repeated_headers_and_decodes_query() {
        let mut request_headers = HeaderMap::new();
        request_headers.append("x-tag", HeaderValue::from_static("a"));
        request_headers.append("x-tag", HeaderValue::from_static("b"));
        let uri: Uri = "/fn/abc/items?name=J%C3%BCrgen&page=2".parse().unwrap();

        let event = http_event(&Method::PUT, &uri, &request_headers, &Bytes::from_static(b"{}"));

        assert_eq!(event.method, "PUT");
        assert_eq!(event.path, "/fn/abc/items");
        assert_eq!(event.headers.get("x-tag").map(String::as_str), Some("a, b"));
        assert_eq!(event.query.get("name").map(String::as_str), Some("Jürgen"));
        assert_eq!(event.query.get("page").map(String::as_str), Some("2"));
        assert_eq!(event.body, "{}");
    }

    #[test]
    fn function_response_defaults_content_type() {
        let rendered = function_response(HttpResponse::new(201, "{}"));
        assert_eq!(rendered.status(), StatusCode::CREATED);
        assert_eq!(
            rendered.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let rendered =
            function_response(HttpResponse::new(200, "hi").with_header("Content-Type", "text/plain"));
        assert_eq!(rendered.headers().get(header::CONTENT_TYPE).unwrap(), "text/plain");
    }
}
