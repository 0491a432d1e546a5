#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Stratus Config
//!
//! Server configuration assembled from layered sources:
//!
//! 1. built-in defaults ([`AppConfig::default`])
//! 2. an optional TOML file
//! 3. `STRATUS_*` environment variables
//!
//! Later layers win key by key. The merged document is deserialized into
//! [`AppConfig`] and validated before use.
//!
//! - [`ConfigLoader`] -- collects sources and produces an [`AppConfig`]
//! - [`ConfigSource`] -- where a layer came from, for diagnostics
//! - [`ConfigError`] -- I/O, parse and validation failures

mod app;
mod error;
mod loader;
mod source;

pub use app::{
    AppConfig, EngineSection, RetentionSection, SchedulerSection, ServerSection, StoreBackend,
    StoreSection,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ENV_PREFIX};
pub use source::ConfigSource;
