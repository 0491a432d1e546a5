//! HTTP-shaped event and response exchanged with function code.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The inbound event a function is invoked with.
///
/// Header and query maps are ordered so serialized snapshots are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpEvent {
    /// HTTP method, upper-case.
    pub method: String,
    /// Request path as received.
    pub path: String,
    /// Request headers; repeated headers are joined with `, `.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Query-string parameters.
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    /// Raw request body.
    #[serde(default)]
    pub body: String,
}

impl HttpEvent {
    /// Create an event with no headers, query or body.
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The HTTP response a function produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    /// Status code; 200 when the function does not set one.
    #[serde(default = "default_status")]
    pub status_code: u16,
    /// Response headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Response body.
    #[serde(default)]
    pub body: String,
}

fn default_status() -> u16 {
    200
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            status_code: default_status(),
            headers: BTreeMap::new(),
            body: String::new(),
        }
    }
}

impl HttpResponse {
    /// Response with a status and body.
    #[must_use]
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Status codes of 400 and above count as an error outcome.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn response_defaults_to_200() {
        let resp: HttpResponse = serde_json::from_str(r#"{"body": "ok"}"#).unwrap();
        assert_eq!(resp.status_code, 200);
        assert!(!resp.is_error());
    }

    #[test]
    fn response_uses_camel_case_status() {
        let resp: HttpResponse = serde_json::from_str(r#"{"statusCode": 500, "body": "boom"}"#).unwrap();
        assert_eq!(resp, HttpResponse::new(500, "boom"));
        assert!(resp.is_error());
    }

    #[test]
    fn error_threshold_is_400() {
        assert!(!HttpResponse::new(399, "").is_error());
        assert!(HttpResponse::new(400, "").is_error());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let event = HttpEvent::new("GET", "/fn/x").with_header("X-Trigger", "cron");
        assert_eq!(event.header("x-trigger"), Some("cron"));
        assert_eq!(event.header("missing"), None);
    }
}
