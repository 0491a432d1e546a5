//! Route handlers.

pub mod executions;
pub mod functions;
pub mod invoke;
pub mod system;
pub mod versions;

pub use invoke::{invoke, invoke_root};
