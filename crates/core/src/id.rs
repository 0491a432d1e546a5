//! Unique identifiers for Stratus entities.
//!
//! Strongly-typed UUID identifiers built on
//! [`domain-key`](https://crates.io/crates/domain-key) `Uuid<D>` wrappers.
//! Each identifier is parameterized by its own domain marker so a
//! [`VersionId`] can never be passed where a [`FunctionId`] is expected.
//!
//! The ids are `Copy`, hash and order like the UUID inside, and travel as
//! hyphenated UUID strings both in JSON and in URL paths. Fresh ids come from
//! `v4()`; `parse` and `FromStr` accept the textual form.

use domain_key::define_uuid;

pub use domain_key::UuidParseError;

define_uuid!(pub FunctionIdDomain => FunctionId);
define_uuid!(pub VersionIdDomain => VersionId);
define_uuid!(pub ExecutionIdDomain => ExecutionId);
