#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Stratus Function
//!
//! Definition types for user-submitted functions.
//!
//! - [`Function`] -- a named unit of user code plus schedule/retention metadata
//! - [`FunctionVersion`] -- one immutable code snapshot of a function
//! - [`NewFunction`] / [`FunctionPatch`] -- creation input and partial update
//! - [`CronExpression`] -- validated cron schedule with next-occurrence lookup
//! - [`RetentionDays`] -- execution retention restricted to an allowed set

pub mod cron_expr;
pub mod definition;
pub mod error;
pub mod version;

pub use cron_expr::CronExpression;
pub use definition::{CronStatus, Function, FunctionPatch, NewFunction, RetentionDays};
pub use error::FunctionError;
pub use version::FunctionVersion;
