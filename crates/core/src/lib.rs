//! # Stratus Core
//!
//! Core types shared by every Stratus crate.
//!
//! ## Key Components
//!
//! - **Identifiers**: [`FunctionId`], [`VersionId`], [`ExecutionId`]
//! - **Pagination**: [`Pagination`] request parameters and the [`Page`] envelope
//!   returned by every list operation
//!
//! ## Usage
//!
//! ```rust
//! use stratus_core::{FunctionId, Pagination};
//!
//! let function_id = FunctionId::v4();
//! let page = Pagination::new(Some(500), Some(40)).normalize();
//! assert_eq!(page.limit, 100);
//! assert!(!function_id.is_nil());
//! ```

pub mod id;
pub mod page;

pub use id::*;
pub use page::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, PageRequest, Pagination};
