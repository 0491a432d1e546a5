#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Stratus Runtime
//!
//! The contract between the execution engine and the language runtimes that
//! actually run user code.
//!
//! This crate provides:
//! - [`Runtime`] -- one implementation per supported language
//! - [`RuntimeContext`] -- ids, start time, version and base URL handed to the code
//! - [`RuntimeOutput`] / [`RuntimeError`] -- what a runtime returns
//! - [`ExecutionLogger`] -- the per-execution log stream, masked on the way in
//! - [`ResponsePolicy`] -- masking and size capping of stored response snapshots
//!
//! The engine depends only on the trait; concrete runtimes live in driver
//! crates and are picked at wiring time.

pub mod context;
pub mod error;
pub mod logger;
pub mod policy;
pub mod runtime;

pub use context::RuntimeContext;
pub use error::RuntimeError;
pub use logger::ExecutionLogger;
pub use policy::{DEFAULT_MAX_RESPONSE_BYTES, ResponsePolicy, TRUNCATION_MARKER};
pub use runtime::{Runtime, RuntimeOutput};
