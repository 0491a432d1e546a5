//! Shared handler state.

use std::sync::Arc;

use stratus_engine::ExecutionEngine;
use stratus_ports::Store;
use stratus_scheduler::CronScheduler;
use stratus_telemetry::MetricsRegistry;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Orchestrates entry point executions.
    pub engine: Arc<ExecutionEngine>,
    /// Backing store for management routes.
    pub store: Arc<dyn Store>,
    /// Cron timers; `None` when the scheduler is disabled.
    pub scheduler: Option<Arc<CronScheduler>>,
    /// Process metrics.
    pub metrics: MetricsRegistry,
}

impl AppState {
    /// State without a scheduler.
    pub fn new(engine: Arc<ExecutionEngine>, store: Arc<dyn Store>, metrics: MetricsRegistry) -> Self {
        Self {
            engine,
            store,
            scheduler: None,
            metrics,
        }
    }

    /// Attach a scheduler.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Arc<CronScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Re-sync the function's cron timer. Failures are logged only.
    pub async fn refresh_cron(&self, function_id: stratus_core::FunctionId) {
        let Some(scheduler) = &self.scheduler else {
            return;
        };
        if let Err(error) = scheduler.refresh_function(function_id).await {
            tracing::warn!(%function_id, %error, "cron refresh failed");
        }
    }
}
