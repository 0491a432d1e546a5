//! Shared fixtures for router tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::Value;
use stratus_api::{AppState, RouterConfig, router};
use stratus_engine::{EngineConfig, ExecutionEngine};
use stratus_function::{Function, NewFunction};
use stratus_ports::{FunctionRepo, VersionRepo};
use stratus_runtime_static::StaticRuntime;
use stratus_scheduler::{CronScheduler, SelfTrigger};
use stratus_store_memory::MemoryStore;
use stratus_telemetry::{EventBus, MetricsRegistry};
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub metrics: MetricsRegistry,
    pub scheduler: Option<Arc<CronScheduler>>,
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

fn build(with_scheduler: bool) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let metrics = MetricsRegistry::new();
    let engine = Arc::new(ExecutionEngine::new(
        store.clone(),
        Arc::new(StaticRuntime::new()),
        Arc::new(EventBus::default()),
        metrics.clone(),
        EngineConfig {
            execution_timeout: Duration::from_secs(2),
            ..EngineConfig::default()
        },
    ));

    let mut state = AppState::new(engine, store.clone(), metrics.clone());
    let scheduler = with_scheduler.then(|| {
        let trigger = SelfTrigger::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        Arc::new(CronScheduler::new(store.clone(), trigger, metrics.clone()))
    });
    if let Some(scheduler) = &scheduler {
        state = state.with_scheduler(scheduler.clone());
    }

    TestApp {
        router: router(state, &RouterConfig::default()),
        store,
        metrics,
        scheduler,
    }
}

pub fn test_app() -> TestApp {
    build(false)
}

pub fn test_app_with_scheduler() -> TestApp {
    build(true)
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        Reply {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> Reply {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn json(&self, method: &str, uri: &str, body: Value) -> Reply {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// A function whose active version holds `code`.
    pub async fn deploy(&self, input: NewFunction, code: &str) -> Function {
        let function = self.store.create_function(input).await.unwrap();
        self.store
            .create_version(function.id, code.to_owned(), None)
            .await
            .unwrap();
        function
    }
}

impl TestApp {
    /// A function with no versions; returns its id.
    pub async fn store_function(&self, name: &str) -> stratus_core::FunctionId {
        self.store
            .create_function(NewFunction::named(name))
            .await
            .unwrap()
            .id
    }
}
