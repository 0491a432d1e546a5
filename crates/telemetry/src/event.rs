//! Execution lifecycle events and the in-process bus that fans them out.
//!
//! The bus is a projection of what the engine does, not a source of truth:
//! the store holds the record. An event nobody listens to is simply lost.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stratus_core::{ExecutionId, FunctionId};
use stratus_execution::Trigger;
use tokio::sync::broadcast;

/// Default channel capacity.
pub const DEFAULT_CAPACITY: usize = 256;

/// Severity of an execution log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Informational output from the function.
    Info,
    /// Something unexpected that did not fail the execution.
    Warn,
    /// Failure text.
    Error,
}

/// Execution lifecycle event.
///
/// Emitted by the engine as an execution progresses. Identifiers are typed;
/// log messages are already masked when they reach the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// The execution was recorded and is about to be dispatched.
    Started {
        /// The execution identifier.
        execution_id: ExecutionId,
        /// The function being run.
        function_id: FunctionId,
        /// Version number being run.
        version: u32,
        /// What caused it.
        trigger: Trigger,
    },
    /// The function ran and produced a non-error response.
    Completed {
        /// The execution identifier.
        execution_id: ExecutionId,
        /// The function that ran.
        function_id: FunctionId,
        /// Status code of the response, if any.
        status_code: Option<u16>,
        /// Wall-clock runtime.
        duration: Duration,
    },
    /// The function failed, timed out, or answered with status >= 400.
    Failed {
        /// The execution identifier.
        execution_id: ExecutionId,
        /// The function that ran.
        function_id: FunctionId,
        /// Masked error description.
        error: String,
        /// Wall-clock runtime.
        duration: Duration,
    },
    /// One line of the execution's log stream.
    Log {
        /// The execution identifier.
        execution_id: ExecutionId,
        /// Severity.
        level: LogLevel,
        /// Masked message text.
        message: String,
    },
}

impl ExecutionEvent {
    /// The execution the event belongs to.
    #[must_use]
    pub fn execution_id(&self) -> ExecutionId {
        match self {
            Self::Started { execution_id, .. }
            | Self::Completed { execution_id, .. }
            | Self::Failed { execution_id, .. }
            | Self::Log { execution_id, .. } => *execution_id,
        }
    }
}

/// Fan-out of [`ExecutionEvent`]s to any number of listeners.
///
/// # Examples
///
/// ```
/// use stratus_core::ExecutionId;
/// use stratus_telemetry::{EventBus, ExecutionEvent, LogLevel};
///
/// let bus = EventBus::new(8);
/// let _listener = bus.subscribe();
///
/// bus.emit(ExecutionEvent::Log {
///     execution_id: ExecutionId::v4(),
///     level: LogLevel::Info,
///     message: "hello".into(),
/// });
/// assert_eq!(bus.published(), 1);
/// ```
pub struct EventBus {
    tx: broadcast::Sender<ExecutionEvent>,
    published: AtomicU64,
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    ///
    /// When the channel is full the oldest events are overwritten; lagging
    /// subscribers skip ahead.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            published: AtomicU64::new(0),
        }
    }

    /// Publish an event. Never blocks and never fails.
    pub fn emit(&self, event: ExecutionEvent) {
        self.published.fetch_add(1, Relaxed);
        // Err carries the event back when nobody is subscribed.
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            rx: self.tx.subscribe(),
        }
    }

    /// Events published over the bus lifetime, listened to or not.
    #[must_use]
    pub fn published(&self) -> u64 {
        self.published.load(Relaxed)
    }

    /// Live subscriptions.
    #[must_use]
    pub fn listeners(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A listener created by [`EventBus::subscribe`].
pub struct EventSubscriber {
    rx: broadcast::Receiver<ExecutionEvent>,
}

impl EventSubscriber {
    /// Receive the next event, skipping over any that were missed.
    ///
    /// Returns `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<ExecutionEvent> {
        use broadcast::error::RecvError;
        loop {
            match self.rx.recv().await {
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break None,
                Ok(event) => break Some(event),
            }
        }
    }

    /// Receive without waiting; `None` if nothing is buffered.
    pub fn try_recv(&mut self) -> Option<ExecutionEvent> {
        use broadcast::error::TryRecvError;
        loop {
            match self.rx.try_recv() {
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break None,
                Ok(event) => break Some(event),
            }
        }
    }

    /// Drain everything currently buffered.
    pub fn drain(&mut self) -> Vec<ExecutionEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn log(execution_id: ExecutionId, message: &str) -> ExecutionEvent {
        ExecutionEvent::Log {
            execution_id,
            level: LogLevel::Info,
            message: message.into(),
        }
    }

    #[test]
    fn emit_without_subscribers_is_counted() {
        let bus = EventBus::default();
        bus.emit(log(ExecutionId::v4(), "x"));
        assert_eq!(bus.published(), 1);
        assert_eq!(bus.listeners(), 0);
    }

    #[test]
    fn every_subscriber_gets_a_copy() {
        let bus = EventBus::new(16);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        let id = ExecutionId::v4();

        bus.emit(log(id, "hello"));

        assert_eq!(a.try_recv(), Some(log(id, "hello")));
        assert_eq!(b.try_recv().map(|e| e.execution_id()), Some(id));
        assert_eq!(a.try_recv(), None);
    }

    #[tokio::test]
    async fn recv_waits_for_the_next_event() {
        let bus = std::sync::Arc::new(EventBus::new(16));
        let mut sub = bus.subscribe();
        let id = ExecutionId::v4();

        let publisher = std::sync::Arc::clone(&bus);
        tokio::spawn(async move {
            publisher.emit(ExecutionEvent::Completed {
                execution_id: id,
                function_id: FunctionId::v4(),
                status_code: Some(200),
                duration: Duration::from_millis(12),
            });
        });

        match sub.recv().await {
            Some(ExecutionEvent::Completed {
                execution_id,
                status_code,
                ..
            }) => {
                assert_eq!(execution_id, id);
                assert_eq!(status_code, Some(200));
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn lagging_subscriber_skips_to_newest() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();
        let id = ExecutionId::v4();
        for i in 0..5 {
            bus.emit(log(id, &i.to_string()));
        }
        let got: Vec<_> = sub
            .drain()
            .into_iter()
            .map(|e| match e {
                ExecutionEvent::Log { message, .. } => message,
                other => panic!("expected a log line, got {other:?}"),
            })
            .collect();
        assert_eq!(got, ["3", "4"]);
    }

    #[test]
    fn events_serialize_with_a_type_tag() {
        let event = ExecutionEvent::Failed {
            execution_id: ExecutionId::nil(),
            function_id: FunctionId::nil(),
            error: "boom".into(),
            duration: Duration::from_millis(3),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "failed");
        assert_eq!(json["error"], "boom");
    }
}
