#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Stratus Telemetry
//!
//! Event bus and metrics for the Stratus function platform.
//!
//! This crate provides:
//! - [`EventBus`] -- broadcast-based event distribution
//! - [`ExecutionEvent`] -- execution lifecycle and log events
//! - [`MetricsRegistry`] -- named counters, gauges and histograms kept in memory
//!
//! Events are **projections**, not the source of truth. The execution record
//! in the store is authoritative; a lagging subscriber may miss events.

pub mod event;
pub mod metrics;

pub use event::{EventBus, EventSubscriber, ExecutionEvent, LogLevel};
pub use metrics::{
    Counter, Gauge, Histogram, HistogramSummary, MetricsRegistry, MetricsSnapshot, names,
};
