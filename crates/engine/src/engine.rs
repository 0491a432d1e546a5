//! The execution engine.
//!
//! One call to [`ExecutionEngine::execute`] walks a single invocation
//! through `resolving -> masking -> dispatching -> recording -> done`.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use stratus_core::{ExecutionId, FunctionId};
use stratus_execution::{ExecutionUpdate, HttpEvent, HttpResponse, NewExecution, Trigger};
use stratus_masking::{mask_http_event, mask_log_message};
use stratus_ports::{Store, StoreError};
use stratus_runtime::{
    ExecutionLogger, ResponsePolicy, Runtime, RuntimeContext, RuntimeError, RuntimeOutput,
};
use stratus_telemetry::{EventBus, ExecutionEvent, MetricsRegistry, names};
use tokio_util::task::AbortOnDropHandle;

use crate::error::{EngineError, RecordError};
use crate::result::{ExecutionOutcome, ExecutionResult};

/// Engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Budget for one runtime dispatch.
    pub execution_timeout: Duration,
    /// Stored response snapshot policy.
    pub response_policy: ResponsePolicy,
    /// Public base URL handed to runtimes.
    pub base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            execution_timeout: Duration::from_secs(30),
            response_policy: ResponsePolicy::default(),
            base_url: "http://127.0.0.1:8080".to_owned(),
        }
    }
}

/// One trigger to execute.
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    /// The function to run.
    pub function_id: FunctionId,
    /// The inbound event, unmasked.
    pub event: HttpEvent,
    /// What caused the execution.
    pub trigger: Trigger,
}

impl ExecuteRequest {
    /// An HTTP-triggered request.
    #[must_use]
    pub fn http(function_id: FunctionId, event: HttpEvent) -> Self {
        Self {
            function_id,
            event,
            trigger: Trigger::Http,
        }
    }

    /// Override the trigger.
    #[must_use]
    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }
}

/// Orchestrates executions against a [`Store`] and a [`Runtime`].
///
/// The engine holds no per-execution state between calls and never caches
/// store data; concurrent calls are independent.
pub struct ExecutionEngine {
    store: Arc<dyn Store>,
    runtime: Arc<dyn Runtime>,
    event_bus: Arc<EventBus>,
    metrics: MetricsRegistry,
    config: EngineConfig,
}

impl ExecutionEngine {
    /// Create an engine with the given components.
    pub fn new(
        store: Arc<dyn Store>,
        runtime: Arc<dyn Runtime>,
        event_bus: Arc<EventBus>,
        metrics: MetricsRegistry,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            runtime,
            event_bus,
            metrics,
            config,
        }
    }

    /// Engine settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute the active version of a function.
    ///
    /// # Flow
    ///
    /// 1. Resolve the function (absent: `FunctionNotFound`, disabled:
    ///    `FunctionDisabled`) and its active version (`NoActiveVersion`)
    /// 2. Mask the event and record a `pending` execution
    ///    (`ExecutionRecord` on failure; nothing runs unrecorded)
    /// 3. Dispatch the *unmasked* event to the runtime under the timeout
    /// 4. Classify: runtime error or status >= 400 is `error`
    /// 5. Finalise the record; a failure here is logged, never returned
    ///
    /// A function that ran and failed yields `Ok` with a failed outcome.
    pub async fn execute(&self, request: ExecuteRequest) -> Result<ExecutionResult, EngineError> {
        let execution_id = ExecutionId::v4();
        let function_id = request.function_id;

        let function = self
            .store
            .get_function(function_id)
            .await
            .map_err(|err| match err {
                StoreError::FunctionNotFound(_) => EngineError::FunctionNotFound { function_id },
                source => EngineError::Store {
                    function_id,
                    source,
                },
            })?;
        if function.disabled {
            return Err(EngineError::FunctionDisabled { function_id });
        }
        let version = self
            .store
            .get_active_version(function_id)
            .await
            .map_err(|err| match err {
                StoreError::NoActiveVersion(_) => EngineError::NoActiveVersion { function_id },
                source => EngineError::Store {
                    function_id,
                    source,
                },
            })?;

        let logger = ExecutionLogger::new(execution_id, function_id, Arc::clone(&self.event_bus));
        let ctx = RuntimeContext {
            execution_id,
            function_id,
            started_at: Utc::now(),
            version: version.version,
            base_url: self.config.base_url.clone(),
            logger: logger.clone(),
        };

        let record_error = |source: RecordError| EngineError::ExecutionRecord {
            function_id,
            source,
        };
        let event_json = serde_json::to_string(&mask_http_event(&request.event))
            .map_err(|e| record_error(e.into()))?;
        self.store
            .create_execution(NewExecution {
                id: execution_id,
                function_id,
                version_id: version.id,
                trigger: request.trigger,
                event_json: Some(event_json),
            })
            .await
            .map_err(|e| record_error(e.into()))?;

        tracing::debug!(
            %execution_id,
            %function_id,
            version = version.version,
            trigger = %request.trigger,
            "dispatching execution"
        );
        self.event_bus.emit(ExecutionEvent::Started {
            execution_id,
            function_id,
            version: version.version,
            trigger: request.trigger,
        });
        let in_flight = self.metrics.gauge(names::EXECUTIONS_IN_FLIGHT);
        in_flight.inc();

        let started = Instant::now();
        let dispatched = self.dispatch(&version.code, &ctx, &request.event).await;
        let duration = started.elapsed();
        in_flight.dec();

        let (response, outcome) = classify(dispatched);
        let response_json = if function.save_response {
            response.as_ref().and_then(|r| self.snapshot(execution_id, r))
        } else {
            None
        };

        let result = ExecutionResult {
            execution_id,
            function_id,
            version_id: version.id,
            version: version.version,
            response,
            duration,
            outcome,
        };
        self.record_outcome(&result, response_json).await;
        self.report(&result, &logger);
        Ok(result)
    }

    /// Run the code on its own task so a panicking runtime still ends in a
    /// finalised record. The task is aborted on timeout or when this future
    /// is dropped.
    async fn dispatch(
        &self,
        code: &str,
        ctx: &RuntimeContext,
        event: &HttpEvent,
    ) -> Result<RuntimeOutput, RuntimeError> {
        let budget = self.config.execution_timeout;
        let execution_id = ctx.execution_id;
        let runtime = Arc::clone(&self.runtime);
        let (code, ctx, event) = (code.to_owned(), ctx.clone(), event.clone());
        let mut task = AbortOnDropHandle::new(tokio::spawn(async move {
            runtime.execute(&code, &ctx, &event).await
        }));

        match tokio::time::timeout(budget, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) if join.is_panic() => {
                let reason = panic_reason(join.into_panic().as_ref());
                tracing::error!(
                    %execution_id,
                    runtime = self.runtime.language(),
                    %reason,
                    "runtime panicked"
                );
                Err(RuntimeError::Internal(format!("panicked: {reason}")))
            }
            Ok(Err(join)) => Err(RuntimeError::Internal(format!("runtime task failed: {join}"))),
            Err(_) => {
                task.abort();
                Err(RuntimeError::Timeout {
                    elapsed_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }

    fn snapshot(&self, execution_id: ExecutionId, response: &HttpResponse) -> Option<String> {
        let snapshot = self.config.response_policy.snapshot(response);
        match serde_json::to_string(&snapshot) {
            Ok(json) => Some(json),
            Err(error) => {
                tracing::warn!(%execution_id, %error, "response snapshot not serializable");
                None
            }
        }
    }

    /// Best-effort final update.
    async fn record_outcome(&self, result: &ExecutionResult, response_json: Option<String>) {
        let update = ExecutionUpdate {
            status: result.status(),
            duration_ms: Some(result.duration_ms()),
            error_message: result.outcome.error_message(),
            response_json,
        };
        if let Err(error) = self.store.update_execution(result.execution_id, update).await {
            self.metrics
                .counter(names::EXECUTION_RECORD_FAILURES_TOTAL)
                .inc();
            tracing::error!(
                execution_id = %result.execution_id,
                function_id = %result.function_id,
                %error,
                "failed to record execution outcome"
            );
        }
    }

    fn report(&self, result: &ExecutionResult, logger: &ExecutionLogger) {
        self.metrics.counter(names::EXECUTIONS_TOTAL).inc();
        self.metrics
            .histogram(names::EXECUTION_DURATION_SECONDS)
            .observe(result.duration.as_secs_f64());

        let (execution_id, function_id) = (result.execution_id, result.function_id);
        match &result.outcome {
            ExecutionOutcome::Success => {
                tracing::info!(
                    %execution_id,
                    %function_id,
                    duration_ms = result.duration_ms(),
                    "execution succeeded"
                );
                self.event_bus.emit(ExecutionEvent::Completed {
                    execution_id,
                    function_id,
                    status_code: result.response.as_ref().map(|r| r.status_code),
                    duration: result.duration,
                });
            }
            ExecutionOutcome::ErrorStatus { .. } | ExecutionOutcome::Failed { .. } => {
                self.metrics.counter(names::EXECUTIONS_FAILED_TOTAL).inc();
                let message = result.outcome.error_message().unwrap_or_default();
                match &result.outcome {
                    ExecutionOutcome::Failed { .. } => logger.error(&message),
                    _ => logger.warn(&message),
                }
                self.event_bus.emit(ExecutionEvent::Failed {
                    execution_id,
                    function_id,
                    error: mask_log_message(&message),
                    duration: result.duration,
                });
            }
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    let text = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");
    mask_log_message(text)
}

fn classify(
    dispatched: Result<RuntimeOutput, RuntimeError>,
) -> (Option<HttpResponse>, ExecutionOutcome) {
    match dispatched {
        Ok(RuntimeOutput {
            response: Some(response),
        }) if response.is_error() => {
            let status_code = response.status_code;
            (Some(response), ExecutionOutcome::ErrorStatus { status_code })
        }
        Ok(output) => (output.response, ExecutionOutcome::Success),
        Err(error) => (None, ExecutionOutcome::Failed { error }),
    }
}
