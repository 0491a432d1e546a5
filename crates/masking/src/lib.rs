#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Stratus Masking
//!
//! Stateless redaction applied before anything is persisted or logged.
//!
//! - [`is_sensitive_header_name`], [`is_sensitive_query_param`],
//!   [`is_sensitive_body_field`] -- name classification
//! - [`mask_headers`], [`mask_query_params`], [`mask_json_body`] -- structured data
//! - [`mask_log_message`] -- free text
//! - [`mask_http_event`], [`mask_http_response`] -- whole event/response shapes
//!
//! Every function is pure: no state, no I/O, and masking already-masked data
//! is a no-op.

mod log;
mod mask;
mod vocab;

pub use log::mask_log_message;
pub use mask::{mask_headers, mask_http_event, mask_http_response, mask_json_body, mask_query_params};
pub use vocab::{is_sensitive_body_field, is_sensitive_header_name, is_sensitive_query_param};

/// Replacement written in place of every sensitive value.
pub const REDACTED: &str = "[REDACTED]";
