//! Cron timers.
//!
//! Every registered function gets one spawned timer task. The task sleeps
//! until the next occurrence, hands the fire to a separate tracked task and
//! loops; cancelling the entry's token ends the loop. Fires are never
//! executed inline, so a slow function never delays the following tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use stratus_core::FunctionId;
use stratus_function::{CronExpression, Function};
use stratus_ports::{Store, StoreError};
use stratus_telemetry::{MetricsRegistry, names};
use tokio::sync::{RwLock, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::SchedulerError;
use crate::trigger::{CronJob, SelfTrigger};

struct TimerEntry {
    job: CronJob,
    next_run: watch::Receiver<Option<DateTime<Utc>>>,
    cancel: CancellationToken,
}

/// Holds one timer per function with an active cron schedule.
///
/// `refresh_function` reads the function and swaps its entry under a single
/// write lock, so an update can never leave two live timers for the same
/// function or a timer built from an outdated read.
pub struct CronScheduler {
    store: Arc<dyn Store>,
    trigger: SelfTrigger,
    metrics: MetricsRegistry,
    entries: RwLock<HashMap<FunctionId, TimerEntry>>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl CronScheduler {
    /// Create an idle scheduler; call [`start`](Self::start) to load timers.
    pub fn new(store: Arc<dyn Store>, trigger: SelfTrigger, metrics: MetricsRegistry) -> Self {
        Self {
            store,
            trigger,
            metrics,
            entries: RwLock::new(HashMap::new()),
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Register every function with an active schedule.
    ///
    /// Entries whose expression no longer parses are skipped with a
    /// warning. Returns the number of timers installed.
    pub async fn start(&self) -> Result<usize, SchedulerError> {
        let functions = self.store.list_functions_with_active_cron().await?;
        let mut entries = self.entries.write().await;
        let mut installed = 0;
        for function in &functions {
            match self.install(&mut entries, function) {
                Ok(true) => installed += 1,
                Ok(false) => {}
                Err(error) => tracing::warn!(
                    function_id = %function.id,
                    %error,
                    "skipping cron job with invalid schedule"
                ),
            }
        }
        tracing::info!(timers = installed, "cron scheduler started");
        Ok(installed)
    }

    /// Re-read one function and replace its timer.
    ///
    /// The old timer is cancelled first. A new one is installed only when
    /// the function still exists with a non-empty `active` schedule.
    /// Returns `true` if a timer is registered afterwards.
    ///
    /// The read happens under the write lock, so concurrent refreshes apply
    /// in order and the last one always reflects the latest stored state.
    pub async fn refresh_function(&self, function_id: FunctionId) -> Result<bool, SchedulerError> {
        let mut entries = self.entries.write().await;
        let function = match self.store.get_function(function_id).await {
            Ok(function) => Some(function),
            Err(StoreError::FunctionNotFound(_)) => None,
            Err(error) => return Err(error.into()),
        };

        if let Some(old) = entries.remove(&function_id) {
            old.cancel.cancel();
            tracing::debug!(%function_id, "cron timer removed");
        }
        match function {
            Some(function) if !self.shutdown.is_cancelled() => self.install(&mut entries, &function),
            _ => Ok(false),
        }
    }

    /// Next scheduled fire of a registered function.
    pub async fn next_run(&self, function_id: FunctionId) -> Option<DateTime<Utc>> {
        let entries = self.entries.read().await;
        entries
            .get(&function_id)
            .and_then(|entry| *entry.next_run.borrow())
    }

    /// Returns `true` if a timer is registered for the function.
    pub async fn is_registered(&self, function_id: FunctionId) -> bool {
        self.entries.read().await.contains_key(&function_id)
    }

    /// Registered jobs.
    pub async fn jobs(&self) -> Vec<CronJob> {
        let entries = self.entries.read().await;
        entries.values().map(|entry| entry.job.clone()).collect()
    }

    /// Cancel all timers and wait for in-flight fires.
    ///
    /// Fires still waiting on the entry point are abandoned rather than
    /// awaited to completion.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        self.entries.write().await.clear();
        self.tasks.close();
        self.tasks.wait().await;
        tracing::info!("cron scheduler stopped");
    }

    fn install(
        &self,
        entries: &mut HashMap<FunctionId, TimerEntry>,
        function: &Function,
    ) -> Result<bool, SchedulerError> {
        let Some(expr) = function.active_cron_schedule() else {
            return Ok(false);
        };
        let schedule = CronExpression::parse(expr)?;
        let job = CronJob {
            function_id: function.id,
            function_name: function.name.clone(),
            schedule: schedule.as_str().to_owned(),
        };

        let (next_tx, next_rx) = watch::channel(schedule.next());
        let cancel = self.shutdown.child_token();
        let timer = Timer {
            job: job.clone(),
            schedule,
            next_run: next_tx,
            cancel: cancel.clone(),
            fire: Fire {
                trigger: self.trigger.clone(),
                metrics: self.metrics.clone(),
                shutdown: self.shutdown.clone(),
            },
            tasks: self.tasks.clone(),
        };
        self.tasks.spawn(timer.run());

        tracing::debug!(
            function_id = %job.function_id,
            schedule = %job.schedule,
            "cron timer installed"
        );
        entries.insert(
            function.id,
            TimerEntry {
                job,
                next_run: next_rx,
                cancel,
            },
        );
        Ok(true)
    }
}

struct Timer {
    job: CronJob,
    schedule: CronExpression,
    next_run: watch::Sender<Option<DateTime<Utc>>>,
    cancel: CancellationToken,
    fire: Fire,
    tasks: TaskTracker,
}

impl Timer {
    async fn run(self) {
        let mut cursor = Utc::now();
        loop {
            let Some(at) = self.schedule.next_after(&cursor) else {
                tracing::debug!(function_id = %self.job.function_id, "cron schedule exhausted");
                self.next_run.send_replace(None);
                return;
            };
            self.next_run.send_replace(Some(at));

            let delay = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!(function_id = %self.job.function_id, "cron timer cancelled");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }

            self.tasks.spawn(self.fire.clone().run(self.job.clone(), at));
            // The clock may still read slightly before `at`.
            cursor = at.max(Utc::now());
        }
    }
}

#[derive(Clone)]
struct Fire {
    trigger: SelfTrigger,
    metrics: MetricsRegistry,
    shutdown: CancellationToken,
}

impl Fire {
    async fn run(self, job: CronJob, scheduled: DateTime<Utc>) {
        self.metrics.counter(names::CRON_TRIGGERS_TOTAL).inc();
        tokio::select! {
            () = self.shutdown.cancelled() => {
                tracing::debug!(function_id = %job.function_id, "cron trigger abandoned on shutdown");
            }
            result = self.trigger.fire(&job, scheduled) => match result {
                Ok(status) => tracing::debug!(
                    function_id = %job.function_id,
                    status,
                    "cron trigger delivered"
                ),
                Err(error) => {
                    self.metrics.counter(names::CRON_TRIGGER_FAILURES_TOTAL).inc();
                    tracing::warn!(
                        function_id = %job.function_id,
                        function_name = %job.function_name,
                        %error,
                        "cron trigger failed"
                    );
                }
            }
        }
    }
}
