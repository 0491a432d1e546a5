//! Entry point behaviour through the full router.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::test_app;
use pretty_assertions::assert_eq;
use stratus_api::headers;
use stratus_core::{FunctionId, Pagination};
use stratus_execution::{ExecutionStatus, HttpEvent, Trigger};
use stratus_function::{FunctionPatch, NewFunction};
use stratus_ports::{ExecutionRepo, FunctionRepo};
use stratus_telemetry::names;

#[tokio::test]
async fn unknown_function_is_404() {
    let app = test_app();
    let reply = app.get(&format!("/fn/{}", FunctionId::v4())).await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(reply.json()["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn disabled_function_is_403() {
    let app = test_app();
    let function = app
        .deploy(NewFunction::named("off"), r#"{"body": "never"}"#)
        .await;
    app.store
        .update_function(
            function.id,
            FunctionPatch {
                disabled: Some(true),
                ..FunctionPatch::default()
            },
        )
        .await
        .unwrap();

    let reply = app.get(&format!("/fn/{}", function.id)).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    let page = app
        .store
        .list_executions(function.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn function_without_version_is_500() {
    let app = test_app();
    let function = app.store.create_function(NewFunction::named("empty")).await.unwrap();

    let reply = app.get(&format!("/fn/{}", function.id)).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(reply.json()["error"].as_str().unwrap().contains("no active version"));
}

#[tokio::test]
async fn success_writes_back_function_response_and_metadata_headers() {
    let app = test_app();
    let function = app
        .deploy(
            NewFunction::named("hello"),
            r#"{"statusCode": 201, "headers": {"X-Greeting": "hi"}, "body": {"ok": true}}"#,
        )
        .await;

    let reply = app
        .json("POST", &format!("/fn/{}", function.id), serde_json::json!({"a": 1}))
        .await;

    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.json(), serde_json::json!({"ok": true}));
    assert_eq!(reply.header("x-greeting"), Some("hi"));
    assert_eq!(reply.header("content-type"), Some("application/json"));
    assert_eq!(
        reply.header(headers::FUNCTION_ID),
        Some(function.id.to_string().as_str())
    );
    assert!(reply.header(headers::FUNCTION_VERSION_ID).is_some());
    assert!(reply.header(headers::EXECUTION_DURATION_MS).is_some());

    let execution_id = reply.header(headers::EXECUTION_ID).unwrap().parse().unwrap();
    let execution = app.store.get_execution(execution_id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Success);
    assert_eq!(execution.trigger, Trigger::Http);
}

#[tokio::test]
async fn sub_paths_and_query_reach_the_runtime() {
    let app = test_app();
    let function = app
        .deploy(
            NewFunction::named("echo"),
            r#"{"headers": {"Content-Type": "text/plain"}, "body": "${method} ${path} ${query.q}"}"#,
        )
        .await;

    let uri = format!("/fn/{}/items/42?q=search", function.id);
    let reply = app
        .send(Request::put(&uri).body(Body::empty()).unwrap())
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.header("content-type"), Some("text/plain"));
    assert_eq!(
        reply.text(),
        format!("PUT /fn/{}/items/42 search", function.id)
    );
}

#[tokio::test]
async fn error_status_is_returned_and_recorded_as_error() {
    let app = test_app();
    let function = app
        .deploy(NewFunction::named("teapot"), r#"{"statusCode": 500, "body": "boom"}"#)
        .await;

    let reply = app.get(&format!("/fn/{}", function.id)).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.text(), "boom");

    let execution_id = reply.header(headers::EXECUTION_ID).unwrap().parse().unwrap();
    let execution = app.store.get_execution(execution_id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Error);
    assert_eq!(
        execution.error_message.as_deref(),
        Some("function responded with status 500")
    );
}

#[tokio::test]
async fn runtime_failure_renders_masked_error() {
    let app = test_app();
    let function = app
        .deploy(
            NewFunction::named("leaky"),
            r#"{"error": "db login failed password=hunter2"}"#,
        )
        .await;

    let reply = app.get(&format!("/fn/{}", function.id)).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = reply.json()["error"].as_str().unwrap().to_owned();
    assert!(!message.contains("hunter2"), "{message}");
    assert!(reply.header(headers::EXECUTION_ID).is_some());
}

#[tokio::test]
async fn cron_header_marks_trigger_and_event_is_stored_masked() {
    let app = test_app();
    let function = app
        .deploy(NewFunction::named("tick"), r#"{"body": "${header.authorization}"}"#)
        .await;

    let reply = app
        .send(
            Request::post(format!("/fn/{}", function.id))
                .header("X-Trigger", "cron")
                .header("Authorization", "Bearer abc.def.ghi")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    // The function sees the real header.
    assert_eq!(reply.text(), "Bearer abc.def.ghi");

    let execution_id = reply.header(headers::EXECUTION_ID).unwrap().parse().unwrap();
    let execution = app.store.get_execution(execution_id).await.unwrap();
    assert_eq!(execution.trigger, Trigger::Cron);
    let stored: HttpEvent = serde_json::from_str(execution.event_json.as_deref().unwrap()).unwrap();
    assert_eq!(stored.header("authorization"), Some("[REDACTED]"));
}

#[tokio::test]
async fn empty_code_answers_200_with_empty_body() {
    let app = test_app();
    let function = app.deploy(NewFunction::named("noop"), "null").await;

    let reply = app.get(&format!("/fn/{}", function.id)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.is_empty());
    assert_eq!(reply.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn executions_are_counted() {
    let app = test_app();
    let function = app.deploy(NewFunction::named("counted"), "null").await;
    for _ in 0..3 {
        app.get(&format!("/fn/{}", function.id)).await;
    }
    assert_eq!(app.metrics.counter(names::EXECUTIONS_TOTAL).get(), 3);

    let reply = app.get("/api/metrics").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["counters"][names::EXECUTIONS_TOTAL].as_u64(), Some(3));
}
