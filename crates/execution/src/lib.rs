#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Stratus Execution
//!
//! Execution-time concepts for the Stratus function platform. This crate
//! models records and shapes; it does NOT contain the orchestrator. It defines:
//!
//! - [`ExecutionStatus`] -- `pending` -> `success` | `error`
//! - [`Trigger`] -- what caused an execution (`http` or `cron`)
//! - [`Execution`], [`NewExecution`], [`ExecutionUpdate`] -- the persisted record
//! - [`HttpEvent`] and [`HttpResponse`] -- the event handed to a function and
//!   the response it produces
//! - State machine transitions validated by the [`transition`] module

pub mod error;
pub mod event;
pub mod record;
pub mod status;
pub mod transition;

pub use error::ExecutionError;
pub use event::{HttpEvent, HttpResponse};
pub use record::{Execution, ExecutionUpdate, NewExecution};
pub use status::{ExecutionStatus, Trigger};
