#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Stratus Scheduler
//!
//! Background work that runs beside the HTTP surface:
//!
//! - [`CronScheduler`] -- one timer per function with an active schedule;
//!   each fire POSTs to the platform's own `/fn/{id}` entry point tagged
//!   `X-Trigger: cron`, so scheduled and organic executions share one path
//! - [`next_run`] -- next occurrence of a raw expression, for previews
//! - [`RetentionSweeper`] -- periodic purge of executions past retention
//!
//! Both services own a [`CancellationToken`] and a task tracker; `stop`
//! cancels and waits for every spawned task.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod cron;
pub mod error;
pub mod preview;
pub mod retention;
pub mod trigger;

pub use cron::CronScheduler;
pub use error::SchedulerError;
pub use preview::next_run;
pub use retention::RetentionSweeper;
pub use trigger::{CronJob, SelfTrigger, headers};
