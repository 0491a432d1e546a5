//! Stored response snapshot policy.
//!
//! Snapshots are masked first and truncated second, so masking always sees
//! a complete JSON document.

use serde::{Deserialize, Serialize};
use stratus_execution::HttpResponse;
use stratus_masking::mask_http_response;

/// Default cap on a stored response body: 1 MiB.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1_048_576;

/// Appended to a body that was cut at the cap.
pub const TRUNCATION_MARKER: &str = "...[truncated]";

/// Controls what a stored response snapshot may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePolicy {
    /// Largest body kept, in bytes, before the marker is appended.
    pub max_body_bytes: usize,
}

impl Default for ResponsePolicy {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

impl ResponsePolicy {
    /// Policy with a custom cap.
    #[must_use]
    pub fn with_max_body_bytes(max_body_bytes: usize) -> Self {
        Self { max_body_bytes }
    }

    /// `Ok(len)` if `body` fits, `Err((limit, actual))` otherwise.
    pub fn check_body_size(&self, body: &str) -> Result<usize, (usize, usize)> {
        if body.len() > self.max_body_bytes {
            Err((self.max_body_bytes, body.len()))
        } else {
            Ok(body.len())
        }
    }

    /// Cut `body` to the cap on a char boundary and append the marker.
    ///
    /// Returns the body unchanged when it fits.
    #[must_use]
    pub fn truncate_body(&self, mut body: String) -> String {
        if self.check_body_size(&body).is_ok() {
            return body;
        }
        let mut end = self.max_body_bytes;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push_str(TRUNCATION_MARKER);
        body
    }

    /// Masked, size-capped copy of `response` suitable for storage.
    #[must_use]
    pub fn snapshot(&self, response: &HttpResponse) -> HttpResponse {
        let mut masked = mask_http_response(response);
        if let Err((limit, actual)) = self.check_body_size(&masked.body) {
            tracing::debug!(limit, actual, "truncating stored response body");
            masked.body = self.truncate_body(masked.body);
        }
        masked
    }
}
