//! Masked per-execution log stream.

use std::sync::Arc;

use stratus_core::{ExecutionId, FunctionId};
use stratus_masking::mask_log_message;
use stratus_telemetry::{EventBus, ExecutionEvent, LogLevel};

/// Log stream bound to one execution.
///
/// Every line is passed through [`mask_log_message`] before it reaches
/// `tracing` or the event bus; unmasked text never leaves this type.
#[derive(Clone)]
pub struct ExecutionLogger {
    execution_id: ExecutionId,
    function_id: FunctionId,
    bus: Option<Arc<EventBus>>,
}

impl std::fmt::Debug for ExecutionLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionLogger")
            .field("execution_id", &self.execution_id)
            .field("function_id", &self.function_id)
            .field("attached", &self.bus.is_some())
            .finish()
    }
}

impl ExecutionLogger {
    /// Logger that also publishes [`ExecutionEvent::Log`] on `bus`.
    #[must_use]
    pub fn new(execution_id: ExecutionId, function_id: FunctionId, bus: Arc<EventBus>) -> Self {
        Self {
            execution_id,
            function_id,
            bus: Some(bus),
        }
    }

    /// Logger that only writes to `tracing`.
    #[must_use]
    pub fn detached(execution_id: ExecutionId, function_id: FunctionId) -> Self {
        Self {
            execution_id,
            function_id,
            bus: None,
        }
    }

    /// The execution this logger belongs to.
    #[must_use]
    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    /// Informational line.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Warning line.
    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Error line.
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Mask `message` and write it at `level`.
    pub fn log(&self, level: LogLevel, message: &str) {
        let message = mask_log_message(message);
        let (execution_id, function_id) = (self.execution_id, self.function_id);
        match level {
            LogLevel::Info => {
                tracing::info!(%execution_id, %function_id, "{message}");
            }
            LogLevel::Warn => {
                tracing::warn!(%execution_id, %function_id, "{message}");
            }
            LogLevel::Error => {
                tracing::error!(%execution_id, %function_id, "{message}");
            }
        }
        if let Some(bus) = &self.bus {
            bus.emit(ExecutionEvent::Log {
                execution_id,
                level,
                message,
            });
        }
    }
}
