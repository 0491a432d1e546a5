#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Stratus Engine
//!
//! Turns one trigger into one recorded, runtime-dispatched execution.
//!
//! - [`ExecutionEngine`] -- resolves the function and its active version,
//!   records a masked `pending` execution, dispatches to the [`Runtime`],
//!   classifies the outcome and finalises the record
//! - [`ExecuteRequest`] -- the trigger: function id, event, trigger type
//! - [`ExecutionResult`] / [`ExecutionOutcome`] -- what happened
//! - [`EngineError`] -- why nothing was attempted
//!
//! Two error channels are kept apart on purpose: [`EngineError`] is returned
//! only when an execution could not be attempted or recorded, while a
//! function that ran and failed is an `Ok` result with a failed outcome.
//!
//! [`Runtime`]: stratus_runtime::Runtime

pub mod engine;
pub mod error;
pub mod result;

pub use engine::{EngineConfig, ExecuteRequest, ExecutionEngine};
pub use error::{EngineError, RecordError};
pub use result::{ExecutionOutcome, ExecutionResult};
