#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Stratus API
//!
//! The HTTP surface of the platform, built on axum.
//!
//! - `ANY /fn/{function_id}[/...]` -- the entry point; every trigger, cron
//!   included, runs through [`handlers::invoke`]
//! - `GET /health` -- store liveness
//! - `GET /api/metrics` -- in-memory metrics snapshot
//! - `/api/functions/...` -- JSON management of functions, versions and
//!   executions, plus cron inspection
//!
//! Build the router with [`router`] from an [`AppState`].

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::{RouterConfig, router};
pub use state::AppState;

/// Response headers attached to every entry point answer.
pub mod headers {
    /// Function that ran.
    pub const FUNCTION_ID: &str = "x-function-id";
    /// Version that ran.
    pub const FUNCTION_VERSION_ID: &str = "x-function-version-id";
    /// Recorded execution.
    pub const EXECUTION_ID: &str = "x-execution-id";
    /// Wall-clock runtime dispatch duration.
    pub const EXECUTION_DURATION_MS: &str = "x-execution-duration-ms";
}
