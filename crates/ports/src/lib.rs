#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Stratus Ports
//!
//! Store interface traits (ports) for the Stratus function platform.
//!
//! Backend drivers implement these; the engine, scheduler and API only ever
//! see the traits:
//!
//! - [`FunctionRepo`] -- function definitions and partial updates
//! - [`VersionRepo`] -- versions and the single-active-version invariant
//! - [`ExecutionRepo`] -- execution records and retention purge
//! - [`Store`] -- all three plus a health probe
//!
//! All traits are `async_trait` and object-safe, suitable for use as
//! `Arc<dyn Store>` behind dependency injection. Deadlines are expressed by
//! the caller wrapping a call in `tokio::time::timeout`; dropping the future
//! abandons it.

pub mod error;
pub mod execution;
pub mod function;
pub mod version;

use async_trait::async_trait;

pub use error::StoreError;
pub use execution::ExecutionRepo;
pub use function::FunctionRepo;
pub use version::VersionRepo;

/// The complete store contract.
#[async_trait]
pub trait Store: FunctionRepo + VersionRepo + ExecutionRepo {
    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}
