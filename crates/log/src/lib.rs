#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Stratus Log
//!
//! Process-wide `tracing` subscriber setup.
//!
//! - [`Config`] -- filter directive, output [`Format`] and display toggles
//! - [`LoggerBuilder`] -- installs the subscriber, returns a [`LoggerGuard`]
//! - [`init`] -- one-call setup from `STRATUS_LOG` / `RUST_LOG`
//!
//! ```no_run
//! let _guard = stratus_log::init().expect("logger");
//! tracing::info!("ready");
//! ```

mod builder;
mod config;
mod error;

pub use builder::{LoggerBuilder, LoggerGuard};
pub use config::{Config, Format};
pub use error::{LogError, LogResult};

/// Install a subscriber configured from the environment.
pub fn init() -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(Config::from_env()).build()
}

/// Install a subscriber from an explicit configuration.
pub fn init_with(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}
