//! Stratus server.
//!
//! Usage: `stratus-server [CONFIG.toml]`. The config path may also be given
//! in `STRATUS_CONFIG`; `STRATUS_<SECTION>__<KEY>` variables override it.

use std::sync::Arc;

use anyhow::Context;
use stratus_api::{AppState, RouterConfig, router};
use stratus_config::{AppConfig, ConfigLoader, StoreBackend};
use stratus_engine::{EngineConfig, ExecutionEngine};
use stratus_ports::Store;
use stratus_runtime::ResponsePolicy;
use stratus_runtime_static::StaticRuntime;
use stratus_scheduler::{CronScheduler, RetentionSweeper, SelfTrigger};
use stratus_store_memory::MemoryStore;
use stratus_store_sqlite::{SqliteOptions, SqliteStore};
use stratus_telemetry::{EventBus, MetricsRegistry};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    let _log_guard = stratus_log::init_with(config.log.clone()).context("failed to initialise logging")?;

    let store = open_store(&config).await?;
    let metrics = MetricsRegistry::new();
    let engine = Arc::new(ExecutionEngine::new(
        Arc::clone(&store),
        Arc::new(StaticRuntime::new()),
        Arc::new(EventBus::default()),
        metrics.clone(),
        EngineConfig {
            execution_timeout: config.execution_timeout(),
            response_policy: ResponsePolicy::with_max_body_bytes(config.engine.max_response_bytes),
            base_url: config.server.base_url.clone(),
        },
    ));

    let mut state = AppState::new(engine, Arc::clone(&store), metrics.clone());
    let scheduler = if config.scheduler.enabled {
        let trigger = SelfTrigger::new(&config.server.base_url, config.trigger_timeout())
            .context("failed to build cron trigger client")?;
        let scheduler = Arc::new(CronScheduler::new(Arc::clone(&store), trigger, metrics.clone()));
        scheduler.start().await.context("failed to start cron scheduler")?;
        state = state.with_scheduler(Arc::clone(&scheduler));
        Some(scheduler)
    } else {
        None
    };

    let background = CancellationToken::new();
    let sweeper = RetentionSweeper::new(
        Arc::clone(&store),
        metrics,
        config.default_retention()?,
        config.sweep_interval(),
    )
    .spawn(background.clone());

    let app = router(
        state,
        &RouterConfig {
            request_timeout: config.request_timeout(),
            max_body_bytes: config.server.max_body_bytes,
        },
    );
    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, base_url = %config.server.base_url, "stratus listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(scheduler) = scheduler {
        scheduler.stop().await;
    }
    background.cancel();
    if let Err(error) = sweeper.await {
        tracing::warn!(%error, "retention sweeper ended abnormally");
    }
    tracing::info!("stratus stopped");
    Ok(())
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store; nothing survives a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Sqlite => {
            let options = SqliteOptions {
                path: config.store.path.clone(),
                max_connections: config.store.max_connections,
                busy_timeout: config.store_busy_timeout(),
            };
            let store = SqliteStore::open(&options)
                .await
                .with_context(|| format!("failed to open {}", options.path.display()))?;
            Ok(Arc::new(store))
        }
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("STRATUS_CONFIG").ok());
    let loader = match &path {
        Some(path) => ConfigLoader::new().with_file(path),
        None => ConfigLoader::new(),
    };
    loader
        .with_env()
        .load()
        .with_context(|| match path {
            Some(path) => format!("failed to load configuration from {path}"),
            None => "failed to load configuration".to_owned(),
        })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
