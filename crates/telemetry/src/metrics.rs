//! In-memory counters, gauges and histograms.
//!
//! Lightweight counter, gauge and histogram types backed by atomics, and a
//! registry that hands out shared handles by name. Values live in memory;
//! [`MetricsRegistry::snapshot`] exposes them for a JSON endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;

/// Metric names recorded by the platform.
pub mod names {
    /// Executions dispatched to a runtime.
    pub const EXECUTIONS_TOTAL: &str = "executions_total";
    /// Executions that finished with status `error`.
    pub const EXECUTIONS_FAILED_TOTAL: &str = "executions_failed_total";
    /// Final execution updates the store rejected or failed to write.
    pub const EXECUTION_RECORD_FAILURES_TOTAL: &str = "execution_record_failures_total";
    /// Runtime wall-clock duration in seconds.
    pub const EXECUTION_DURATION_SECONDS: &str = "execution_duration_seconds";
    /// Executions currently running.
    pub const EXECUTIONS_IN_FLIGHT: &str = "executions_in_flight";
    /// Cron self-triggers sent.
    pub const CRON_TRIGGERS_TOTAL: &str = "cron_triggers_total";
    /// Cron self-triggers that failed or got a non-2xx answer.
    pub const CRON_TRIGGER_FAILURES_TOTAL: &str = "cron_trigger_failures_total";
    /// Execution rows removed by the retention sweeper.
    pub const RETENTION_DELETED_TOTAL: &str = "retention_deleted_total";
}

/// A monotonically increasing counter.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicU64>);

impl Counter {
    /// Increment by one.
    pub fn inc(&self) {
        self.inc_by(1);
    }

    /// Increment by `n`.
    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A value that can go up and down.
#[derive(Debug, Clone, Default)]
pub struct Gauge(Arc<AtomicI64>);

impl Gauge {
    /// Increment by one.
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement by one.
    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
struct HistogramState {
    count: u64,
    sum: f64,
    max: f64,
}

/// Running count, sum and max of observations.
#[derive(Debug, Clone, Default)]
pub struct Histogram(Arc<Mutex<HistogramState>>);

impl Histogram {
    /// Record an observation.
    pub fn observe(&self, value: f64) {
        let mut state = self.0.lock();
        state.count += 1;
        state.sum += value;
        if value > state.max {
            state.max = value;
        }
    }

    /// Number of observations.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.0.lock().count
    }

    /// Sum of all observations.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.0.lock().sum
    }

    fn summary(&self) -> HistogramSummary {
        let state = self.0.lock();
        HistogramSummary {
            count: state.count,
            sum: state.sum,
            max: state.max,
        }
    }
}

/// Point-in-time view of a histogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramSummary {
    /// Number of observations.
    pub count: u64,
    /// Sum of observations.
    pub sum: f64,
    /// Largest observation.
    pub max: f64,
}

/// Point-in-time view of every registered metric, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Counter values.
    pub counters: BTreeMap<String, u64>,
    /// Gauge values.
    pub gauges: BTreeMap<String, i64>,
    /// Histogram summaries.
    pub histograms: BTreeMap<String, HistogramSummary>,
}

/// Named metric handles, shared by every clone of the registry.
///
/// Handles are cheap clones sharing one underlying value, so callers may
/// look a metric up once and keep it.
///
/// # Examples
///
/// ```
/// use stratus_telemetry::{MetricsRegistry, names};
///
/// let registry = MetricsRegistry::default();
/// registry.counter(names::EXECUTIONS_TOTAL).inc();
/// assert_eq!(registry.counter(names::EXECUTIONS_TOTAL).get(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetricsRegistry {
    counters: Arc<DashMap<String, Counter>>,
    gauges: Arc<DashMap<String, Gauge>>,
    histograms: Arc<DashMap<String, Histogram>>,
}

impl MetricsRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a counter.
    pub fn counter(&self, name: &str) -> Counter {
        self.counters.entry(name.to_owned()).or_default().clone()
    }

    /// Get or create a gauge.
    pub fn gauge(&self, name: &str) -> Gauge {
        self.gauges.entry(name.to_owned()).or_default().clone()
    }

    /// Get or create a histogram.
    pub fn histogram(&self, name: &str) -> Histogram {
        self.histograms.entry(name.to_owned()).or_default().clone()
    }

    /// Copy out every current value.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self
                .counters
                .iter()
                .map(|e| (e.key().clone(), e.value().get()))
                .collect(),
            gauges: self
                .gauges
                .iter()
                .map(|e| (e.key().clone(), e.value().get()))
                .collect(),
            histograms: self
                .histograms
                .iter()
                .map(|e| (e.key().clone(), e.value().summary()))
                .collect(),
        }
    }
}
