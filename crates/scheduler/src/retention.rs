//! Periodic execution purge.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use stratus_core::{MAX_PAGE_SIZE, Pagination};
use stratus_function::{Function, RetentionDays};
use stratus_ports::Store;
use stratus_telemetry::{MetricsRegistry, names};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::SchedulerError;

/// Deletes executions older than each function's retention window.
///
/// Functions without their own `retention_days` fall back to the
/// configured default; with no default they are left alone.
#[derive(Clone)]
pub struct RetentionSweeper {
    store: Arc<dyn Store>,
    metrics: MetricsRegistry,
    default_days: Option<RetentionDays>,
    interval: Duration,
}

impl RetentionSweeper {
    /// Create a sweeper running every `interval`.
    pub fn new(
        store: Arc<dyn Store>,
        metrics: MetricsRegistry,
        default_days: Option<RetentionDays>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            metrics,
            default_days,
            interval,
        }
    }

    /// Retention applied to `function`.
    #[must_use]
    pub fn retention_for(&self, function: &Function) -> Option<RetentionDays> {
        function.retention_days.or(self.default_days)
    }

    /// One pass over every function as of `now`; returns rows deleted.
    ///
    /// A failing function is logged and skipped so one bad row cannot stall
    /// the rest of the pass.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<u64, SchedulerError> {
        let mut deleted = 0;
        let mut offset = 0;
        loop {
            let page = self
                .store
                .list_functions(Pagination::new(Some(MAX_PAGE_SIZE), Some(offset)))
                .await?;
            let fetched = page.items.len();
            for function in &page.items {
                let Some(days) = self.retention_for(function) else {
                    continue;
                };
                let cutoff = now - days.as_duration();
                match self
                    .store
                    .delete_function_executions_before(function.id, cutoff)
                    .await
                {
                    Ok(0) => {}
                    Ok(n) => {
                        tracing::debug!(function_id = %function.id, deleted = n, %cutoff, "purged executions");
                        deleted += n;
                    }
                    Err(error) => tracing::warn!(
                        function_id = %function.id,
                        %error,
                        "retention purge failed"
                    ),
                }
            }
            offset += fetched;
            if fetched == 0 || offset as u64 >= page.total {
                break;
            }
        }

        self.metrics
            .counter(names::RETENTION_DELETED_TOTAL)
            .inc_by(deleted);
        Ok(deleted)
    }

    /// Run [`sweep_once`](Self::sweep_once) on the interval until `cancel`
    /// fires. The first pass runs immediately.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        tracing::debug!("retention sweeper stopped");
                        return;
                    }
                    _ = ticker.tick() => {}
                }
                match self.sweep_once(Utc::now()).await {
                    Ok(deleted) => tracing::info!(deleted, "retention sweep finished"),
                    Err(error) => tracing::warn!(%error, "retention sweep failed"),
                }
            }
        })
    }
}
